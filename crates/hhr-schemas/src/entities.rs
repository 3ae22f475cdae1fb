//! Canonical hand-history entities.
//!
//! Entities are created once at ingestion and never updated. JSON form is
//! camelCase because it is what replay consumers read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ActionName, Card, Position, Street};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hand {
    pub id: Uuid,
    /// Id assigned by the poker client; used for dedup.
    pub external_hand_id: Option<String>,
    pub date: String,
    pub time: String,
    pub table_name: String,
    pub small_blind: f64,
    pub max_players: i32,
    pub dealer_seat: i32,
    pub total_pot: f64,
    pub main_pot: f64,
    pub side_pot: f64,
    pub side_pot2: f64,
    pub rake: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub hand_id: Uuid,
    /// 0..=9
    pub seat: i32,
    pub position: Option<Position>,
    pub name: String,
    pub chips: f64,
    pub chips_after_hand: f64,
    pub is_sitting_out: bool,
    pub is_hero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCards {
    pub player_id: Uuid,
    pub card1: Card,
    pub card2: Card,
}

/// Board cards. Slots fill monotonically: turn implies flop, river implies turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityCards {
    pub hand_id: Uuid,
    pub flop1: Option<Card>,
    pub flop2: Option<Card>,
    pub flop3: Option<Card>,
    pub turn: Option<Card>,
    pub river: Option<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: Uuid,
    pub hand_id: Uuid,
    pub player_id: Uuid,
    pub street: Street,
    /// Zero-based, unique within (hand, street).
    pub sequence: i32,
    pub name: ActionName,
    pub amount: Option<f64>,
    /// "Raise to" amount.
    pub amount2: Option<f64>,
    pub card1: Option<Card>,
    pub card2: Option<Card>,
    pub text: Option<String>,
}

impl Action {
    /// Global play-order key.
    pub fn order_key(&self) -> (Street, i32) {
        (self.street, self.sequence)
    }
}

/// Everything the normalizer produces for one export, ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHand {
    pub hand: Hand,
    pub players: Vec<Player>,
    pub community_cards: Option<CommunityCards>,
    pub actions: Vec<Action>,
    pub player_cards: Vec<PlayerCards>,
}

// ---------------------------------------------------------------------------
// Read aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerFull {
    #[serde(flatten)]
    pub player: Player,
    pub cards: Option<PlayerCards>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionFull {
    #[serde(flatten)]
    pub action: Action,
    pub player: Player,
}

/// A stored hand with its players, ordered actions and board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandFull {
    #[serde(flatten)]
    pub hand: Hand,
    pub players: Vec<PlayerFull>,
    /// Sorted by (street, sequence).
    pub actions: Vec<ActionFull>,
    pub community_cards: Option<CommunityCards>,
}

impl HandFull {
    /// Assemble the read aggregate from a normalized bundle. Actions are
    /// sorted into play order; actions whose player is missing are dropped.
    pub fn from_normalized(n: &NormalizedHand) -> Self {
        let players = n
            .players
            .iter()
            .map(|p| PlayerFull {
                player: p.clone(),
                cards: n.player_cards.iter().find(|c| c.player_id == p.id).copied(),
            })
            .collect();

        let mut actions: Vec<ActionFull> = n
            .actions
            .iter()
            .filter_map(|a| {
                let player = n.players.iter().find(|p| p.id == a.player_id)?;
                Some(ActionFull {
                    action: a.clone(),
                    player: player.clone(),
                })
            })
            .collect();
        actions.sort_by_key(|a| a.action.order_key());

        HandFull {
            hand: n.hand.clone(),
            players,
            actions,
            community_cards: n.community_cards,
        }
    }
}
