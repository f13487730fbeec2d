use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::card::RANKS;
use crate::game::Game;

#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(err) => write!(f, "i/o error: {err}"),
            CodecError::Parse(msg) => write!(f, "malformed game file: {msg}"),
            CodecError::Invalid(msg) => write!(f, "invalid game state: {msg}"),
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}

impl Game {
    pub fn save(&self, path: &Path) -> Result<(), CodecError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CodecError::Parse(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a game file. Trusted sources (our own snapshots) skip the
    /// deck-integrity validation; anything user-supplied does not.
    pub fn load(path: &Path, trusted: bool) -> Result<Self, CodecError> {
        let json = fs::read_to_string(path)?;
        let game: Game =
            serde_json::from_str(&json).map_err(|e| CodecError::Parse(e.to_string()))?;
        if !trusted {
            game.validate()?;
        }
        Ok(game)
    }

    fn validate(&self) -> Result<(), CodecError> {
        let piles = self
            .foundations
            .iter()
            .chain(self.tableau.iter())
            .chain([&self.stock, &self.waste]);

        let mut seen = HashSet::new();
        let mut total = 0usize;
        for card in piles.flatten() {
            if card.rank >= RANKS {
                return Err(CodecError::Invalid(format!(
                    "card rank {} out of range",
                    card.rank
                )));
            }
            if !seen.insert((card.suit, card.rank)) {
                return Err(CodecError::Invalid(format!(
                    "duplicate card {}",
                    card.label()
                )));
            }
            total += 1;
        }
        if total != 52 {
            return Err(CodecError::Invalid(format!(
                "expected 52 cards, found {total}"
            )));
        }
        Ok(())
    }
}
