use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use hhr_schemas::{HandFull, NormalizedHand};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{HandStore, InsertOutcome};

#[derive(Default)]
struct Tables {
    hands: HashMap<Uuid, NormalizedHand>,
    by_external_id: HashMap<String, Uuid>,
}

/// In-process [`HandStore`] with the same uniqueness rules as Postgres.
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct MemoryHandStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryHandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.hands.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HandStore for MemoryHandStore {
    async fn find_hand_by_external_id(&self, external_id: &str) -> Result<Option<Uuid>> {
        Ok(self.tables.read().await.by_external_id.get(external_id).copied())
    }

    async fn insert_hand(&self, n: &NormalizedHand) -> Result<InsertOutcome> {
        let mut t = self.tables.write().await;
        if let Some(ext) = &n.hand.external_hand_id {
            if let Some(&existing) = t.by_external_id.get(ext) {
                return Ok(InsertOutcome::Duplicate { existing });
            }
            t.by_external_id.insert(ext.clone(), n.hand.id);
        }
        t.hands.insert(n.hand.id, n.clone());
        Ok(InsertOutcome::Inserted { hand_id: n.hand.id })
    }

    async fn fetch_hand(&self, hand_id: Uuid) -> Result<Option<HandFull>> {
        Ok(self
            .tables
            .read()
            .await
            .hands
            .get(&hand_id)
            .map(HandFull::from_normalized))
    }

    async fn list_hands(&self, page: u32, page_size: u32) -> Result<Vec<HandFull>> {
        let t = self.tables.read().await;
        let mut all: Vec<&NormalizedHand> = t.hands.values().collect();
        all.sort_by(|a, b| {
            (b.hand.created_at, b.hand.id).cmp(&(a.hand.created_at, a.hand.id))
        });
        let skip = (page as usize).saturating_mul(page_size as usize);
        Ok(all
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .map(HandFull::from_normalized)
            .collect())
    }
}
