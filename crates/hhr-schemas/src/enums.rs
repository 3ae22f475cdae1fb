//! Closed enumerations shared by ingestion, storage, and replay.
//!
//! Each enum has a JSON form (serde) and a storage form (`as_str` / `as_i16`)
//! plus a way back from the storage form (`parse` / `from_i16`).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Street
// ---------------------------------------------------------------------------

/// Phase of a hand. Declaration order is play order, so `Ord` sorts actions
/// the way they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Pre,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    pub const ALL: [Street; 6] = [
        Street::Pre,
        Street::Preflop,
        Street::Flop,
        Street::Turn,
        Street::River,
        Street::Showdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Street::Pre => "pre",
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
            Street::Showdown => "showdown",
        }
    }

    /// Storage form (`actions.street` column).
    pub fn as_i16(&self) -> i16 {
        match self {
            Street::Pre => 0,
            Street::Preflop => 1,
            Street::Flop => 2,
            Street::Turn => 3,
            Street::River => 4,
            Street::Showdown => 5,
        }
    }

    pub fn from_i16(n: i16) -> Option<Self> {
        usize::try_from(n).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// The street whose actions immediately precede this street's reveal.
    pub fn previous(&self) -> Option<Street> {
        match self {
            Street::Pre => None,
            other => Street::from_i16(other.as_i16() - 1),
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionName
// ---------------------------------------------------------------------------

/// Every action a poker client can record against a player.
///
/// JSON and storage share the PascalCase variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionName {
    PostSmallBlind,
    PostBigBlind,
    SitsOut,
    Fold,
    Call,
    Raise,
    Check,
    Bet,
    BetAndAllIn,
    CallAndAllIn,
    RaiseAndAllIn,
    Muck,
    Shows,
    Collected,
    CashedOut,
    TimedOut,
    UncalledBet,
    DoesNotShow,
    Join,
    Leave,
    Disconnected,
    Connected,
    CollectedFromSidePot,
    CollectedFromMainPot,
}

impl ActionName {
    pub const ALL: [ActionName; 24] = [
        ActionName::PostSmallBlind,
        ActionName::PostBigBlind,
        ActionName::SitsOut,
        ActionName::Fold,
        ActionName::Call,
        ActionName::Raise,
        ActionName::Check,
        ActionName::Bet,
        ActionName::BetAndAllIn,
        ActionName::CallAndAllIn,
        ActionName::RaiseAndAllIn,
        ActionName::Muck,
        ActionName::Shows,
        ActionName::Collected,
        ActionName::CashedOut,
        ActionName::TimedOut,
        ActionName::UncalledBet,
        ActionName::DoesNotShow,
        ActionName::Join,
        ActionName::Leave,
        ActionName::Disconnected,
        ActionName::Connected,
        ActionName::CollectedFromSidePot,
        ActionName::CollectedFromMainPot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionName::PostSmallBlind => "PostSmallBlind",
            ActionName::PostBigBlind => "PostBigBlind",
            ActionName::SitsOut => "SitsOut",
            ActionName::Fold => "Fold",
            ActionName::Call => "Call",
            ActionName::Raise => "Raise",
            ActionName::Check => "Check",
            ActionName::Bet => "Bet",
            ActionName::BetAndAllIn => "BetAndAllIn",
            ActionName::CallAndAllIn => "CallAndAllIn",
            ActionName::RaiseAndAllIn => "RaiseAndAllIn",
            ActionName::Muck => "Muck",
            ActionName::Shows => "Shows",
            ActionName::Collected => "Collected",
            ActionName::CashedOut => "CashedOut",
            ActionName::TimedOut => "TimedOut",
            ActionName::UncalledBet => "UncalledBet",
            ActionName::DoesNotShow => "DoesNotShow",
            ActionName::Join => "Join",
            ActionName::Leave => "Leave",
            ActionName::Disconnected => "Disconnected",
            ActionName::Connected => "Connected",
            ActionName::CollectedFromSidePot => "CollectedFromSidePot",
            ActionName::CollectedFromMainPot => "CollectedFromMainPot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == s)
    }

    /// Connection and seat bookkeeping. These never show up in a replay.
    pub fn is_bookkeeping(&self) -> bool {
        matches!(
            self,
            ActionName::Connected
                | ActionName::Disconnected
                | ActionName::SitsOut
                | ActionName::Join
                | ActionName::Leave
        )
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Table position relative to the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "BTN")]
    Btn,
    #[serde(rename = "SB")]
    Sb,
    #[serde(rename = "BB")]
    Bb,
    #[serde(rename = "UTG")]
    Utg,
    #[serde(rename = "UTG+1", alias = "UTG1")]
    Utg1,
    #[serde(rename = "UTG+2", alias = "UTG2")]
    Utg2,
    #[serde(rename = "LJ")]
    Lj,
    #[serde(rename = "HJ")]
    Hj,
    #[serde(rename = "CO")]
    Co,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::Btn,
        Position::Sb,
        Position::Bb,
        Position::Utg,
        Position::Utg1,
        Position::Utg2,
        Position::Lj,
        Position::Hj,
        Position::Co,
    ];

    /// Storage form (`hand_players.position` column).
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Btn => "BTN",
            Position::Sb => "SB",
            Position::Bb => "BB",
            Position::Utg => "UTG",
            Position::Utg1 => "UTG1",
            Position::Utg2 => "UTG2",
            Position::Lj => "LJ",
            Position::Hj => "HJ",
            Position::Co => "CO",
        }
    }

    /// Accepts both the storage form and the display form (`UTG+1`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let canonical = s.replace('+', "");
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(&canonical))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
