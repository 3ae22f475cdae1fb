//! Shared types for hand-history ingestion and replay.

mod card;
mod entities;
mod enums;
mod payload;

pub use card::{Card, InvalidCard};
pub use entities::{
    Action, ActionFull, CommunityCards, Hand, HandFull, NormalizedHand, Player, PlayerCards,
    PlayerFull,
};
pub use enums::{ActionName, Position, Street};
pub use payload::{RawAction, RawHand, RawPlayer, RawPlayerAction};
