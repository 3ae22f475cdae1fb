//! In-process live-update fan-out.
//!
//! A [`Broadcaster`] owns the registry of connected viewers. Each viewer holds
//! a [`Subscription`]: a bounded channel that yields [`Notification`]s and
//! removes itself from the registry when dropped.
//!
//! Delivery is best-effort and at-most-once per subscriber per publish.
//! `publish` never blocks: it snapshots the registry under the lock, delivers
//! outside it, and prunes closed subscribers in a second guarded step.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

pub type SubscriberId = u64;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Events pushed to viewers. JSON form: `{"type":"connected"}`,
/// `{"type":"new-hand"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    /// Sent once, to the new subscriber only.
    Connected,
    NewHand,
}

/// Outcome of one `publish` pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Subscriber queue was full; delivery skipped, subscriber kept.
    pub skipped_full: usize,
    /// Closed subscribers pruned after the pass.
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Registry {
    next_id: AtomicU64,
    capacity: usize,
    subscribers: Mutex<BTreeMap<SubscriberId, mpsc::Sender<Notification>>>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriberId, mpsc::Sender<Notification>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.lock().remove(&id).is_some()
    }
}

/// Cloneable handle to the process-wide subscriber registry.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Registry>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Broadcaster {
    /// `capacity` bounds each subscriber's queue (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Register a subscriber. Its first item is always `Connected`.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        // Fresh channel with capacity >= 1; this cannot fail.
        let _ = tx.try_send(Notification::Connected);
        self.inner.lock().insert(id, tx);
        debug!(subscriber = id, "subscriber registered");
        Subscription {
            id,
            rx: ReceiverStream::new(rx),
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver to every currently registered subscriber.
    pub fn publish(&self, notification: Notification) -> PublishReport {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<Notification>)> = self
            .inner
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut report = PublishReport::default();
        let mut closed = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(notification) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.skipped_full += 1;
                    warn!(subscriber = id, ?notification, "subscriber queue full; delivery skipped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subs = self.inner.lock();
            for id in closed {
                if subs.remove(&id).is_some() {
                    report.removed += 1;
                    debug!(subscriber = id, "closed subscriber removed");
                }
            }
        }
        report
    }

    /// Explicit removal. Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().len()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Receiving half of one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    rx: ReceiverStream<Notification>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.next().await
    }

    /// Close the receiving side without unregistering; the next publish
    /// observes a closed channel and prunes this subscriber.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(subscriber = self.id, "subscriber dropped");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
