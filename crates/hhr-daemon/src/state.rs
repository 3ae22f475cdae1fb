//! Shared runtime state for hhr-daemon.
//!
//! All types here are `Clone`-able (via `Arc` or copy). Handlers receive
//! `State<Arc<AppState>>` from Axum; this module owns nothing async itself.

use std::sync::Arc;
use std::time::Duration;

use hhr_config::DeskConfig;
use hhr_db::{HandStore, MemoryHandStore};
use hhr_ingest::IngestGate;
use hhr_notify::Broadcaster;
use serde::{Deserialize, Serialize};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Dedup + normalize + store + notify.
    pub gate: IngestGate,
    /// Read side of the same store the gate writes to.
    pub store: Arc<dyn HandStore>,
    /// Live-update registry behind GET /v1/events.
    pub broadcaster: Broadcaster,
    pub build: BuildInfo,
    pub config: DeskConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn HandStore>, config: DeskConfig) -> Self {
        let broadcaster = Broadcaster::new(config.notify.channel_capacity);
        Self {
            gate: IngestGate::new(Arc::clone(&store), broadcaster.clone()),
            store,
            broadcaster,
            build: BuildInfo {
                service: "hhr-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config,
        }
    }

    /// Fresh state over an empty in-memory store with default config.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHandStore::new()), DeskConfig::default())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.config.notify.keepalive_secs)
    }
}
