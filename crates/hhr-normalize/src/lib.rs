//! Entity normalization for raw hand exports.
//!
//! Converts a [`RawHand`] into a [`NormalizedHand`]: fresh ids for the hand,
//! players and actions, validated enumerations and cards, hero detection and
//! hole cards resolved across the whole action list.
//!
//! It does **not**:
//! - check for duplicates (that is the ingestion gate)
//! - write to the database

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use hhr_schemas::{
    Action, ActionName, Card, CommunityCards, Hand, NormalizedHand, Player, PlayerCards, Position,
    RawHand, Street,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

pub const MAX_SEAT: i32 = 9;
pub const MAX_COMMUNITY_CARDS: usize = 5;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Reasons a payload is rejected. All of them are client errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The payload does not match the export schema.
    Schema(String),
    /// The external hand id is empty.
    EmptyExternalId,
    SeatOutOfRange { player: String, seat: i32 },
    DuplicatePlayer(String),
    UnknownPosition { player: String, raw: String },
    UnknownActionType { street: Street, index: usize, raw: String },
    InvalidCard { field: String, raw: String },
    TooManyCommunityCards(usize),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::Schema(msg) => write!(f, "malformed hand payload: {msg}"),
            NormalizeError::EmptyExternalId => write!(f, "hand id must not be empty"),
            NormalizeError::SeatOutOfRange { player, seat } => {
                write!(f, "player '{player}' has seat {seat}; expected 0..={MAX_SEAT}")
            }
            NormalizeError::DuplicatePlayer(name) => {
                write!(f, "player name '{name}' appears more than once")
            }
            NormalizeError::UnknownPosition { player, raw } => {
                write!(f, "player '{player}' has unknown position '{raw}'")
            }
            NormalizeError::UnknownActionType { street, index, raw } => {
                write!(f, "{street} action #{index} has unknown type '{raw}'")
            }
            NormalizeError::InvalidCard { field, raw } => {
                write!(f, "{field} holds invalid card '{raw}'")
            }
            NormalizeError::TooManyCommunityCards(n) => {
                write!(f, "{n} community cards supplied; at most {MAX_COMMUNITY_CARDS} allowed")
            }
        }
    }
}

impl std::error::Error for NormalizeError {}

// ---------------------------------------------------------------------------
// Payload parsing
// ---------------------------------------------------------------------------

/// Decode an untyped JSON tree into the export schema.
pub fn parse_payload(v: &serde_json::Value) -> Result<RawHand, NormalizeError> {
    RawHand::deserialize(v).map_err(|e| NormalizeError::Schema(e.to_string()))
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one export. `created_at` is stamped on the hand.
///
/// Actions whose player name is not in the player list are skipped with a
/// warning; every other inconsistency rejects the whole payload.
pub fn normalize(raw: &RawHand, created_at: DateTime<Utc>) -> Result<NormalizedHand, NormalizeError> {
    if raw.id.trim().is_empty() {
        return Err(NormalizeError::EmptyExternalId);
    }

    let hand_id = Uuid::new_v4();
    let hand = Hand {
        id: hand_id,
        external_hand_id: Some(raw.id.clone()),
        date: raw.date.clone(),
        time: raw.time.clone(),
        table_name: raw.table_name.clone(),
        small_blind: raw.small_blind,
        max_players: raw.max_players,
        dealer_seat: raw.dealer_seat,
        total_pot: raw.total_pot,
        main_pot: raw.main_pot,
        side_pot: raw.side_pot,
        side_pot2: raw.side_pot2,
        rake: raw.rake,
        created_at,
    };

    // name -> player id, needed to resolve every action.
    let mut player_ids: HashMap<&str, Uuid> = HashMap::with_capacity(raw.players.len());
    let mut players = Vec::with_capacity(raw.players.len());
    for rp in &raw.players {
        if !(0..=MAX_SEAT).contains(&rp.seat) {
            return Err(NormalizeError::SeatOutOfRange {
                player: rp.name.clone(),
                seat: rp.seat,
            });
        }
        let position = match rp.position.as_deref() {
            None => None,
            Some(p) => Some(Position::parse(p).ok_or_else(|| NormalizeError::UnknownPosition {
                player: rp.name.clone(),
                raw: p.to_string(),
            })?),
        };
        let id = Uuid::new_v4();
        if player_ids.insert(rp.name.as_str(), id).is_some() {
            return Err(NormalizeError::DuplicatePlayer(rp.name.clone()));
        }
        players.push(Player {
            id,
            hand_id,
            seat: rp.seat,
            position,
            name: rp.name.clone(),
            chips: rp.chips,
            chips_after_hand: rp.chips_after_hand,
            is_sitting_out: rp.is_sitting_out,
            is_hero: raw.hero_name.as_deref() == Some(rp.name.as_str()),
        });
    }

    // name -> hole cards; later entries override earlier ones.
    let mut hole_cards: BTreeMap<String, (Card, Card)> = BTreeMap::new();
    if let (Some(hero), Some(cards)) = (&raw.hero_name, &raw.hero_cards) {
        if cards.len() == 2 {
            let c1 = parse_card(&cards[0], "hero_cards[0]")?;
            let c2 = parse_card(&cards[1], "hero_cards[1]")?;
            hole_cards.insert(hero.clone(), (c1, c2));
        }
    }

    let community_cards = normalize_board(raw.community_cards.as_deref(), hand_id)?;

    let mut actions = Vec::new();
    for (street, bucket) in raw.street_buckets() {
        for (index, entry) in bucket.iter().enumerate() {
            let name = ActionName::parse(&entry.action.kind).ok_or_else(|| {
                NormalizeError::UnknownActionType {
                    street,
                    index,
                    raw: entry.action.kind.clone(),
                }
            })?;

            let shown = entry.action.cards.as_deref().unwrap_or(&[]);
            let field = |slot: usize| format!("{street}_actions[{index}].cards[{slot}]");
            let card1 = shown.first().map(|c| parse_card(c, &field(0))).transpose()?;
            let card2 = shown.get(1).map(|c| parse_card(c, &field(1))).transpose()?;

            let Some(&player_id) = player_ids.get(entry.player_name.as_str()) else {
                warn!(
                    external_hand_id = %raw.id,
                    %street,
                    index,
                    player = %entry.player_name,
                    "action references unknown player; skipped"
                );
                continue;
            };

            if name == ActionName::Shows && shown.len() == 2 {
                if let (Some(c1), Some(c2)) = (card1, card2) {
                    hole_cards.insert(entry.player_name.clone(), (c1, c2));
                }
            }

            actions.push(Action {
                id: Uuid::new_v4(),
                hand_id,
                player_id,
                street,
                // Bucket index, not the position among kept actions.
                sequence: index as i32,
                name,
                amount: entry.action.amount,
                amount2: entry.action.to,
                card1,
                card2,
                text: entry.action.desc.clone(),
            });
        }
    }

    let player_cards = hole_cards
        .into_iter()
        .filter_map(|(name, (card1, card2))| {
            player_ids.get(name.as_str()).map(|&player_id| PlayerCards {
                player_id,
                card1,
                card2,
            })
        })
        .collect();

    Ok(NormalizedHand {
        hand,
        players,
        community_cards,
        actions,
        player_cards,
    })
}

/// Decode and normalize in one step.
pub fn normalize_value(
    v: &serde_json::Value,
    created_at: DateTime<Utc>,
) -> Result<NormalizedHand, NormalizeError> {
    normalize(&parse_payload(v)?, created_at)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_card(raw: &str, field: &str) -> Result<Card, NormalizeError> {
    Card::parse(raw).map_err(|_| NormalizeError::InvalidCard {
        field: field.to_string(),
        raw: raw.to_string(),
    })
}

/// Slots 0-2 flop, 3 turn, 4 river. An absent or empty array means no board.
fn normalize_board(
    cards: Option<&[String]>,
    hand_id: Uuid,
) -> Result<Option<CommunityCards>, NormalizeError> {
    let cards = match cards {
        Some(c) if !c.is_empty() => c,
        _ => return Ok(None),
    };
    if cards.len() > MAX_COMMUNITY_CARDS {
        return Err(NormalizeError::TooManyCommunityCards(cards.len()));
    }
    let slot = |i: usize| -> Result<Option<Card>, NormalizeError> {
        cards
            .get(i)
            .map(|c| parse_card(c, &format!("community_cards[{i}]")))
            .transpose()
    };
    Ok(Some(CommunityCards {
        hand_id,
        flop1: slot(0)?,
        flop2: slot(1)?,
        flop3: slot(2)?,
        turn: slot(3)?,
        river: slot(4)?,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn act(player: &str, kind: &str) -> serde_json::Value {
        json!({ "player_name": player, "action": { "type": kind } })
    }

    fn base() -> serde_json::Value {
        json!({
            "id": "PS-1001",
            "date": "2025/01/02",
            "time": "10:11:12",
            "table_name": "Alpha II",
            "small_blind": 0.5,
            "max_players": 6,
            "dealer_seat": 3,
            "total_pot": 1.5,
            "main_pot": 1.5,
            "rake": 0.0,
            "hero_name": "hero",
            "hero_cards": ["As", "Kh"],
            "players": [
                {"seat": 1, "position": "SB", "name": "sb", "chips": 50.0, "chips_after_hand": 49.5},
                {"seat": 2, "position": "BB", "name": "bb", "chips": 80.0, "chips_after_hand": 80.5},
                {"seat": 3, "position": "UTG", "name": "hero", "chips": 100.0, "chips_after_hand": 100.0}
            ],
            "pre_actions": [
                { "player_name": "sb", "action": { "type": "PostSmallBlind", "amount": 0.5 } },
                { "player_name": "bb", "action": { "type": "PostBigBlind", "amount": 1.0 } }
            ],
            "preflop_actions": [ act("hero", "Fold") ],
            "community_cards": []
        })
    }

    #[test]
    fn blinds_and_fold_produce_three_actions_and_no_board() {
        let n = normalize_value(&base(), now()).unwrap();
        assert_eq!(n.actions.len(), 3);
        assert!(n.community_cards.is_none());
        assert_eq!(n.hand.external_hand_id.as_deref(), Some("PS-1001"));
        assert_eq!(n.hand.created_at, now());
        assert_ne!(n.hand.id.to_string(), "PS-1001");
    }

    #[test]
    fn sequence_is_bucket_index_per_street() {
        let n = normalize_value(&base(), now()).unwrap();
        let keys: Vec<_> = n.actions.iter().map(|a| a.order_key()).collect();
        assert_eq!(
            keys,
            vec![(Street::Pre, 0), (Street::Pre, 1), (Street::Preflop, 0)]
        );
        assert_eq!(n.actions[0].amount, Some(0.5));
    }

    #[test]
    fn hero_flag_and_hero_cards() {
        let n = normalize_value(&base(), now()).unwrap();
        let heroes: Vec<_> = n.players.iter().filter(|p| p.is_hero).collect();
        assert_eq!(heroes.len(), 1);
        assert_eq!(heroes[0].name, "hero");
        assert_eq!(n.player_cards.len(), 1);
        assert_eq!(n.player_cards[0].player_id, heroes[0].id);
        assert_eq!(n.player_cards[0].card1.to_string(), "As");
    }

    #[test]
    fn hero_cards_ignored_unless_exactly_two() {
        let mut v = base();
        v["hero_cards"] = json!(["As"]);
        let n = normalize_value(&v, now()).unwrap();
        assert!(n.player_cards.is_empty());
    }

    #[test]
    fn unknown_player_action_is_skipped_not_fatal() {
        let mut v = base();
        v["preflop_actions"] = json!([act("ghost", "Call"), act("hero", "Fold")]);
        let n = normalize_value(&v, now()).unwrap();
        assert_eq!(n.actions.len(), 3);
        // The kept action keeps its bucket index.
        let last = n.actions.last().unwrap();
        assert_eq!(last.order_key(), (Street::Preflop, 1));
    }

    #[test]
    fn river_shows_records_hole_cards() {
        let mut v = base();
        v["hero_cards"] = json!(null);
        v["community_cards"] = json!(["2c", "7d", "9h", "Js", "Qc"]);
        v["river_actions"] = json!([
            { "player_name": "bb", "action": { "type": "Shows", "cards": ["Ah", "Ad"], "desc": "a pair of Aces" } }
        ]);
        let n = normalize_value(&v, now()).unwrap();
        let bb = n.players.iter().find(|p| p.name == "bb").unwrap();
        assert_eq!(n.player_cards.len(), 1);
        assert_eq!(n.player_cards[0].player_id, bb.id);
        assert_eq!(n.player_cards[0].card2.to_string(), "Ad");
        let shows = n.actions.iter().find(|a| a.name == ActionName::Shows).unwrap();
        assert_eq!(shows.street, Street::River);
        assert_eq!(shows.text.as_deref(), Some("a pair of Aces"));
    }

    #[test]
    fn showdown_shows_overrides_hero_cards() {
        let mut v = base();
        v["show_down_actions"] = json!([
            { "player_name": "hero", "action": { "type": "Shows", "cards": ["Qs", "Qd"] } }
        ]);
        let n = normalize_value(&v, now()).unwrap();
        assert_eq!(n.player_cards.len(), 1);
        assert_eq!(n.player_cards[0].card1.to_string(), "Qs");
    }

    #[test]
    fn raise_to_maps_to_amount2() {
        let mut v = base();
        v["preflop_actions"] = json!([
            { "player_name": "hero", "action": { "type": "Raise", "amount": 2.0, "to": 3.0 } }
        ]);
        let n = normalize_value(&v, now()).unwrap();
        let raise = n.actions.last().unwrap();
        assert_eq!(raise.amount, Some(2.0));
        assert_eq!(raise.amount2, Some(3.0));
    }

    #[test]
    fn board_slots_fill_in_order() {
        let mut v = base();
        v["community_cards"] = json!(["As", "Kd", "2c", "7h"]);
        let board = normalize_value(&v, now()).unwrap().community_cards.unwrap();
        assert_eq!(board.flop3.unwrap().to_string(), "2c");
        assert_eq!(board.turn.unwrap().to_string(), "7h");
        assert!(board.river.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let mut v = base();
        v["community_cards"] = json!(["As", "Kd", "2c", "7h", "8h", "9h"]);
        assert_eq!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::TooManyCommunityCards(6)
        );

        let mut v = base();
        v["preflop_actions"] = json!([act("hero", "Limp")]);
        assert!(matches!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::UnknownActionType { street: Street::Preflop, index: 0, .. }
        ));

        let mut v = base();
        v["players"][0]["seat"] = json!(10);
        assert!(matches!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::SeatOutOfRange { seat: 10, .. }
        ));

        let mut v = base();
        v["players"][1]["name"] = json!("sb");
        assert_eq!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::DuplicatePlayer("sb".to_string())
        );

        let mut v = base();
        v["community_cards"] = json!(["As", "Kd", "1c"]);
        assert!(matches!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::InvalidCard { .. }
        ));

        let mut v = base();
        v["id"] = json!("  ");
        assert_eq!(
            normalize_value(&v, now()).unwrap_err(),
            NormalizeError::EmptyExternalId
        );
    }

    #[test]
    fn schema_errors_are_reported() {
        let err = normalize_value(&json!({"id": "x"}), now()).unwrap_err();
        assert!(matches!(err, NormalizeError::Schema(_)));
        assert!(err.to_string().starts_with("malformed hand payload"));
    }
}
