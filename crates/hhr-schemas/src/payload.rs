//! Raw hand export as posted by the poker client.
//!
//! Serde enforces the shape (required fields, numeric types). Value domains
//! (card notation, action names, seats) are checked by the normalizer so it
//! can report exactly which entry is wrong.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHand {
    /// External hand id assigned by the poker client.
    pub id: String,
    pub date: String,
    pub time: String,
    pub table_name: String,
    pub small_blind: f64,
    pub max_players: i32,
    pub dealer_seat: i32,
    pub total_pot: f64,
    pub main_pot: f64,
    #[serde(default)]
    pub side_pot: f64,
    #[serde(default)]
    pub side_pot2: f64,
    pub rake: f64,
    pub players: Vec<RawPlayer>,
    #[serde(default)]
    pub community_cards: Option<Vec<String>>,
    #[serde(default)]
    pub hero_name: Option<String>,
    #[serde(default)]
    pub hero_cards: Option<Vec<String>>,
    #[serde(default)]
    pub pre_actions: Vec<RawPlayerAction>,
    #[serde(default)]
    pub preflop_actions: Vec<RawPlayerAction>,
    #[serde(default)]
    pub flop_actions: Vec<RawPlayerAction>,
    #[serde(default)]
    pub turn_actions: Vec<RawPlayerAction>,
    #[serde(default)]
    pub river_actions: Vec<RawPlayerAction>,
    #[serde(default)]
    pub show_down_actions: Vec<RawPlayerAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayer {
    pub seat: i32,
    #[serde(default)]
    pub position: Option<String>,
    pub name: String,
    pub chips: f64,
    pub chips_after_hand: f64,
    #[serde(default, alias = "sitting_out")]
    pub is_sitting_out: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlayerAction {
    pub player_name: String,
    pub action: RawAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<f64>,
    /// "Raise to" target.
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(default)]
    pub cards: Option<Vec<String>>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl RawHand {
    /// Action buckets in play order, paired with the street they belong to.
    pub fn street_buckets(&self) -> [(crate::Street, &[RawPlayerAction]); 6] {
        use crate::Street;
        [
            (Street::Pre, self.pre_actions.as_slice()),
            (Street::Preflop, self.preflop_actions.as_slice()),
            (Street::Flop, self.flop_actions.as_slice()),
            (Street::Turn, self.turn_actions.as_slice()),
            (Street::River, self.river_actions.as_slice()),
            (Street::Showdown, self.show_down_actions.as_slice()),
        ]
    }
}
