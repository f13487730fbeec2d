use serde::{Deserialize, Serialize};

/// Number of ranks per suit. Ranks are 0-based internally:
/// 0 = ace, 12 = king.
pub const RANKS: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Club,
    Spade,
    Heart,
    Diamond,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Heart, Suit::Diamond];

    pub fn is_red(self) -> bool {
        matches!(self, Suit::Heart | Suit::Diamond)
    }

    pub fn letter(self) -> char {
        match self {
            Suit::Club => 'C',
            Suit::Spade => 'S',
            Suit::Heart => 'H',
            Suit::Diamond => 'D',
        }
    }

    pub fn foundation_index(self) -> usize {
        match self {
            Suit::Club => 0,
            Suit::Spade => 1,
            Suit::Heart => 2,
            Suit::Diamond => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: u8,
    pub face_up: bool,
}

impl Card {
    pub fn label(&self) -> String {
        format!("{}{}", rank_label(self.rank), self.suit.letter())
    }

    pub fn color_red(&self) -> bool {
        self.suit.is_red()
    }
}

pub fn rank_label(rank: u8) -> &'static str {
    match rank {
        0 => "A",
        1 => "2",
        2 => "3",
        3 => "4",
        4 => "5",
        5 => "6",
        6 => "7",
        7 => "8",
        8 => "9",
        9 => "10",
        10 => "J",
        11 => "Q",
        12 => "K",
        _ => "?",
    }
}
