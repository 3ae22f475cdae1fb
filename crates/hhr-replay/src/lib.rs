//! Replay timeline construction.
//!
//! Pure and deterministic: the same [`HandFull`] always yields the same
//! sequence. Bookkeeping actions (connects, sit-outs, seat changes) are
//! dropped; community-card reveals are merged between the last action of the
//! preceding street and the first action of the revealed street.

use hhr_schemas::{ActionFull, Card, CommunityCards, HandFull, Street};
use serde::{Deserialize, Serialize};

/// Board cards revealed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommunityCardReveal {
    Flop {
        flop1: Card,
        flop2: Option<Card>,
        flop3: Option<Card>,
    },
    Turn {
        turn: Card,
    },
    River {
        river: Card,
    },
}

impl CommunityCardReveal {
    /// The street whose actions follow this reveal.
    pub fn street(&self) -> Street {
        match self {
            CommunityCardReveal::Flop { .. } => Street::Flop,
            CommunityCardReveal::Turn { .. } => Street::Turn,
            CommunityCardReveal::River { .. } => Street::River,
        }
    }
}

/// One step of a replay.
///
/// Serializes as `{ "action": .., "communityCard": null }` or
/// `{ "action": null, "communityCard": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ReplayEntry", try_from = "ReplayEntry")]
pub enum ReplayEvent {
    PlayerAction(Box<ActionFull>),
    Reveal(CommunityCardReveal),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplayEntry {
    action: Option<Box<ActionFull>>,
    community_card: Option<CommunityCardReveal>,
}

impl From<ReplayEvent> for ReplayEntry {
    fn from(e: ReplayEvent) -> Self {
        match e {
            ReplayEvent::PlayerAction(a) => ReplayEntry {
                action: Some(a),
                community_card: None,
            },
            ReplayEvent::Reveal(r) => ReplayEntry {
                action: None,
                community_card: Some(r),
            },
        }
    }
}

impl TryFrom<ReplayEntry> for ReplayEvent {
    type Error = &'static str;

    fn try_from(e: ReplayEntry) -> Result<Self, Self::Error> {
        match (e.action, e.community_card) {
            (Some(a), None) => Ok(ReplayEvent::PlayerAction(a)),
            (None, Some(r)) => Ok(ReplayEvent::Reveal(r)),
            _ => Err("replay entry must carry exactly one of action or communityCard"),
        }
    }
}

impl ReplayEvent {
    pub fn as_action(&self) -> Option<&ActionFull> {
        match self {
            ReplayEvent::PlayerAction(a) => Some(a),
            ReplayEvent::Reveal(_) => None,
        }
    }

    pub fn as_reveal(&self) -> Option<&CommunityCardReveal> {
        match self {
            ReplayEvent::PlayerAction(_) => None,
            ReplayEvent::Reveal(r) => Some(r),
        }
    }
}

/// Reveals present on the board, in dealing order.
pub fn reveals(board: Option<&CommunityCards>) -> Vec<CommunityCardReveal> {
    let Some(b) = board else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(3);
    if let Some(flop1) = b.flop1 {
        out.push(CommunityCardReveal::Flop {
            flop1,
            flop2: b.flop2,
            flop3: b.flop3,
        });
    }
    if let Some(turn) = b.turn {
        out.push(CommunityCardReveal::Turn { turn });
    }
    if let Some(river) = b.river {
        out.push(CommunityCardReveal::River { river });
    }
    out
}

/// Build the ordered replay for one hand.
///
/// A reveal for street `S` lands right after the highest-sequence gameplay
/// action of the street before `S`. When that street has no gameplay actions
/// it lands before the first action of street `S` or later (at the end if
/// there is none), which keeps the street order intact when streets are
/// skipped or blinds were posted but nobody acted preflop. Blind posts
/// (street `pre`) therefore always come before the flop reveal.
pub fn build_timeline(hand: &HandFull) -> Vec<ReplayEvent> {
    let mut gameplay: Vec<&ActionFull> = hand
        .actions
        .iter()
        .filter(|a| !a.action.name.is_bookkeeping())
        .collect();
    // Stable, so already-ordered input is left untouched.
    gameplay.sort_by_key(|a| a.action.order_key());

    let reveals = reveals(hand.community_cards.as_ref());

    // Insertion slot per reveal: number of gameplay actions that precede it.
    let slots: Vec<usize> = reveals
        .iter()
        .map(|r| insertion_slot(&gameplay, r.street()))
        .collect();

    let mut out = Vec::with_capacity(gameplay.len() + reveals.len());
    let mut pending = reveals.into_iter().zip(slots).peekable();
    for (i, action) in gameplay.into_iter().enumerate() {
        while let Some((reveal, _)) = pending.next_if(|(_, slot)| *slot == i) {
            out.push(ReplayEvent::Reveal(reveal));
        }
        out.push(ReplayEvent::PlayerAction(Box::new(action.clone())));
    }
    out.extend(pending.map(|(reveal, _)| ReplayEvent::Reveal(reveal)));
    out
}

fn insertion_slot(gameplay: &[&ActionFull], street: Street) -> usize {
    let preceding = street.previous();
    let last_of_preceding = gameplay
        .iter()
        .enumerate()
        .filter(|(_, a)| Some(a.action.street) == preceding)
        .max_by_key(|(_, a)| a.action.sequence)
        .map(|(i, _)| i);

    match last_of_preceding {
        Some(i) => i + 1,
        None => gameplay
            .iter()
            .position(|a| a.action.street >= street)
            .unwrap_or(gameplay.len()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
