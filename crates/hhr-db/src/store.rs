use anyhow::Result;
use async_trait::async_trait;
use hhr_schemas::{HandFull, NormalizedHand};
use uuid::Uuid;

/// Result of writing one normalized hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { hand_id: Uuid },
    /// A hand with the same external id already exists; nothing was written.
    Duplicate { existing: Uuid },
}

/// Storage for ingested hands. Writes are all-or-nothing per hand.
#[async_trait]
pub trait HandStore: Send + Sync {
    async fn find_hand_by_external_id(&self, external_id: &str) -> Result<Option<Uuid>>;

    /// Write hand, players, board, actions and hole cards as one unit.
    /// A uniqueness conflict on the external id yields `Duplicate`.
    async fn insert_hand(&self, hand: &NormalizedHand) -> Result<InsertOutcome>;

    /// Actions come back ordered by (street, sequence).
    async fn fetch_hand(&self, hand_id: Uuid) -> Result<Option<HandFull>>;

    /// Newest first; `page` is zero-based.
    async fn list_hands(&self, page: u32, page_size: u32) -> Result<Vec<HandFull>>;

    async fn most_recent_hand(&self) -> Result<Option<HandFull>> {
        Ok(self.list_hands(0, 1).await?.into_iter().next())
    }
}
