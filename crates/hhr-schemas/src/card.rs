use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const RANKS: &str = "23456789TJQKA";
const SUITS: &str = "shdc";

/// A single playing card in two-character notation (`As`, `Td`, `2c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card {
    rank: char,
    suit: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCard(pub String);

impl fmt::Display for InvalidCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid card '{}': expected rank [23456789TJQKA] + suit [shdc]", self.0)
    }
}

impl std::error::Error for InvalidCard {}

impl Card {
    pub fn rank(&self) -> char {
        self.rank
    }

    pub fn suit(&self) -> char {
        self.suit
    }

    pub fn parse(s: &str) -> Result<Self, InvalidCard> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(rank), Some(suit), None) if RANKS.contains(rank) && SUITS.contains(suit) => {
                Ok(Card { rank, suit })
            }
            _ => Err(InvalidCard(s.to_string())),
        }
    }
}

impl FromStr for Card {
    type Err = InvalidCard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Card::parse(s)
    }
}

impl TryFrom<String> for Card {
    type Error = InvalidCard;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Card::parse(&s)
    }
}

impl From<Card> for String {
    fn from(c: Card) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}
