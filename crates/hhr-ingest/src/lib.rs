//! Ingestion gate: dedup, normalize, store, notify.
//!
//! At most one stored hand per external hand id. A payload whose id is
//! already stored is acknowledged without being normalized again. Live-update
//! delivery never affects the outcome of an ingestion.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hhr_db::{HandStore, InsertOutcome};
use hhr_normalize::NormalizeError;
use hhr_notify::{Broadcaster, Notification};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

/// Successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestAck {
    Stored { hand_id: Uuid },
    /// Already stored under the same external id; nothing written.
    Duplicate { hand_id: Uuid },
}

impl IngestAck {
    pub fn hand_id(&self) -> Uuid {
        match self {
            IngestAck::Stored { hand_id } | IngestAck::Duplicate { hand_id } => *hand_id,
        }
    }
}

#[derive(Debug)]
pub enum IngestError {
    /// Client error: the payload was rejected before any write.
    Validation(NormalizeError),
    /// Server error: the store failed.
    Storage(anyhow::Error),
}

impl IngestError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::Validation(_))
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Validation(e) => write!(f, "{e}"),
            IngestError::Storage(e) => write!(f, "failed to store hand: {e:#}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Validation(e) => Some(e),
            IngestError::Storage(e) => Some(&**e),
        }
    }
}

impl From<NormalizeError> for IngestError {
    fn from(e: NormalizeError) -> Self {
        IngestError::Validation(e)
    }
}

#[derive(Clone)]
pub struct IngestGate {
    store: Arc<dyn HandStore>,
    broadcaster: Broadcaster,
}

impl IngestGate {
    pub fn new(store: Arc<dyn HandStore>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub async fn ingest(&self, payload: &Value) -> Result<IngestAck, IngestError> {
        self.ingest_at(payload, Utc::now()).await
    }

    /// Same as [`ingest`](Self::ingest) with an explicit creation time.
    pub async fn ingest_at(
        &self,
        payload: &Value,
        created_at: DateTime<Utc>,
    ) -> Result<IngestAck, IngestError> {
        if let Some(external_id) = payload.get("id").and_then(Value::as_str) {
            if let Some(hand_id) = self
                .store
                .find_hand_by_external_id(external_id)
                .await
                .map_err(IngestError::Storage)?
            {
                info!(external_hand_id = external_id, %hand_id, "duplicate hand ignored");
                return Ok(IngestAck::Duplicate { hand_id });
            }
        }

        let normalized = hhr_normalize::normalize_value(payload, created_at)?;

        let hand_id = match self
            .store
            .insert_hand(&normalized)
            .await
            .map_err(IngestError::Storage)?
        {
            InsertOutcome::Inserted { hand_id } => hand_id,
            InsertOutcome::Duplicate { existing } => {
                info!(
                    external_hand_id = normalized.hand.external_hand_id.as_deref().unwrap_or(""),
                    hand_id = %existing,
                    "duplicate hand ignored after concurrent insert"
                );
                return Ok(IngestAck::Duplicate { hand_id: existing });
            }
        };

        let report = self.broadcaster.publish(Notification::NewHand);
        if report.skipped_full > 0 || report.removed > 0 {
            warn!(
                %hand_id,
                skipped_full = report.skipped_full,
                removed = report.removed,
                "new-hand notification not delivered to every subscriber"
            );
        }
        info!(
            %hand_id,
            external_hand_id = normalized.hand.external_hand_id.as_deref().unwrap_or(""),
            players = normalized.players.len(),
            actions = normalized.actions.len(),
            notified = report.delivered,
            "hand stored"
        );

        Ok(IngestAck::Stored { hand_id })
    }
}
