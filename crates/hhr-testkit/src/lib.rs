//! Payload fixtures and builders shared by scenario tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hhr_schemas::NormalizedHand;
use serde_json::{json, Value};

/// A complete five-player hand: raise/call preflop, three postflop streets,
/// two hands shown at showdown, one sitting-out player with bookkeeping
/// actions.
pub const SHOWDOWN_HAND_JSON: &str = include_str!("../fixtures/showdown_hand.json");

pub fn showdown_hand() -> Result<Value> {
    parse_fixture("showdown_hand.json", SHOWDOWN_HAND_JSON)
}

fn parse_fixture(name: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("parse fixture {name}"))
}

/// Fixed timestamp for deterministic entities.
pub fn epoch_plus(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
}

/// Normalize a payload with a fixed creation time.
pub fn normalized(v: &Value, created_secs: i64) -> Result<NormalizedHand> {
    hhr_normalize::normalize_value(v, epoch_plus(created_secs)).context("normalize fixture")
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder for raw hand payloads. Starts as a heads-up hand with
/// blinds posted and no other action.
#[derive(Debug, Clone)]
pub struct HandPayload {
    v: Value,
}

impl HandPayload {
    pub fn new(external_id: &str) -> Self {
        let v = json!({
            "id": external_id,
            "date": "2025/03/14",
            "time": "20:00:00",
            "table_name": "Testbed",
            "small_blind": 0.5,
            "max_players": 6,
            "dealer_seat": 1,
            "total_pot": 1.5,
            "main_pot": 1.5,
            "rake": 0.0,
            "players": [],
            "pre_actions": [],
            "preflop_actions": [],
            "flop_actions": [],
            "turn_actions": [],
            "river_actions": [],
            "show_down_actions": []
        });
        HandPayload { v }
    }

    /// Two players "sb" (seat 1) and "bb" (seat 2) with blinds posted.
    pub fn heads_up(external_id: &str) -> Self {
        HandPayload::new(external_id)
            .player(1, Some("SB"), "sb", 50.0)
            .player(2, Some("BB"), "bb", 50.0)
            .action("pre", "sb", "PostSmallBlind", Some(0.5))
            .action("pre", "bb", "PostBigBlind", Some(1.0))
    }

    pub fn player(mut self, seat: i32, position: Option<&str>, name: &str, chips: f64) -> Self {
        if let Some(players) = self.v["players"].as_array_mut() {
            players.push(json!({
                "seat": seat,
                "position": position,
                "name": name,
                "chips": chips,
                "chips_after_hand": chips,
                "is_sitting_out": false
            }));
        }
        self
    }

    /// `street` is the bucket prefix: pre, preflop, flop, turn, river, show_down.
    pub fn action(mut self, street: &str, player: &str, kind: &str, amount: Option<f64>) -> Self {
        let key = format!("{street}_actions");
        if let Some(bucket) = self.v[key.as_str()].as_array_mut() {
            bucket.push(json!({
                "player_name": player,
                "action": { "type": kind, "amount": amount }
            }));
        }
        self
    }

    pub fn shows(mut self, street: &str, player: &str, c1: &str, c2: &str) -> Self {
        let key = format!("{street}_actions");
        if let Some(bucket) = self.v[key.as_str()].as_array_mut() {
            bucket.push(json!({
                "player_name": player,
                "action": { "type": "Shows", "cards": [c1, c2] }
            }));
        }
        self
    }

    pub fn board(mut self, cards: &[&str]) -> Self {
        self.v["community_cards"] = json!(cards);
        self
    }

    pub fn hero(mut self, name: &str, cards: &[&str]) -> Self {
        self.v["hero_name"] = json!(name);
        self.v["hero_cards"] = json!(cards);
        self
    }

    pub fn build(self) -> Value {
        self.v
    }
}
