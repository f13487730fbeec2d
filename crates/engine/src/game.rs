use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::card::{Card, Suit, RANKS};
use crate::moves::{UndoGroup, UndoOp};

pub const TABLEAU_COLUMNS: usize = 7;
pub const FOUNDATION_PILES: usize = 4;

/// Identifies one pile on the table. Piles are owned by `Game` and only
/// ever mutated through its move primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackId {
    Stock,
    Waste,
    Foundation(u8),
    Tableau(u8),
}

impl StackId {
    pub fn label(self) -> String {
        match self {
            StackId::Stock => "stock".to_string(),
            StackId::Waste => "waste".to_string(),
            StackId::Foundation(i) => format!("foundation {i}"),
            StackId::Tableau(i) => format!("column {i}"),
        }
    }

    pub(crate) fn is_valid(self) -> bool {
        match self {
            StackId::Stock | StackId::Waste => true,
            StackId::Foundation(i) => (i as usize) < FOUNDATION_PILES,
            StackId::Tableau(i) => (i as usize) < TABLEAU_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub(crate) stock: Vec<Card>,
    pub(crate) waste: Vec<Card>,
    pub(crate) foundations: [Vec<Card>; FOUNDATION_PILES],
    pub(crate) tableau: [Vec<Card>; TABLEAU_COLUMNS],
    pub(crate) move_count: u32,
    pub(crate) finished: bool,
    #[serde(default)]
    pub(crate) undo: Vec<UndoGroup>,
}

impl Game {
    pub fn from_piles(
        stock: Vec<Card>,
        waste: Vec<Card>,
        foundations: [Vec<Card>; FOUNDATION_PILES],
        tableau: [Vec<Card>; TABLEAU_COLUMNS],
    ) -> Self {
        Self {
            stock,
            waste,
            foundations,
            tableau,
            move_count: 0,
            finished: false,
            undo: Vec::new(),
        }
    }

    /// Deal a fresh game from a shuffled 52-card deck. The same seed
    /// always produces the same layout.
    pub fn deal_seeded(seed: u64) -> Self {
        let mut deck: Vec<Card> = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 0..RANKS {
                deck.push(Card { suit, rank, face_up: false });
            }
        }
        let mut rng = StdRng::seed_from_u64(seed);
        deck.shuffle(&mut rng);

        let mut tableau: [Vec<Card>; TABLEAU_COLUMNS] = Default::default();
        for (col, pile) in tableau.iter_mut().enumerate() {
            for row in 0..=col {
                if let Some(mut card) = deck.pop() {
                    card.face_up = row == col;
                    pile.push(card);
                }
            }
        }

        Self::from_piles(deck, Vec::new(), Default::default(), tableau)
    }

    pub fn pile(&self, id: StackId) -> &[Card] {
        match id {
            StackId::Stock => &self.stock,
            StackId::Waste => &self.waste,
            StackId::Foundation(i) => self
                .foundations
                .get(i as usize)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            StackId::Tableau(i) => self
                .tableau
                .get(i as usize)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    pub(crate) fn pile_mut(&mut self, id: StackId) -> Option<&mut Vec<Card>> {
        match id {
            StackId::Stock => Some(&mut self.stock),
            StackId::Waste => Some(&mut self.waste),
            StackId::Foundation(i) => self.foundations.get_mut(i as usize),
            StackId::Tableau(i) => self.tableau.get_mut(i as usize),
        }
    }

    pub fn top(&self, id: StackId) -> Option<Card> {
        self.pile(id).last().copied()
    }

    pub fn size(&self, id: StackId) -> usize {
        self.pile(id).len()
    }

    pub fn face_up_size(&self, id: StackId) -> usize {
        self.pile(id).iter().filter(|card| card.face_up).count()
    }

    pub fn face_down_size(&self, id: StackId) -> usize {
        self.pile(id).iter().filter(|card| !card.face_up).count()
    }

    /// Draw one card from the stock onto the waste, recycling the waste
    /// back into the stock first when the stock has run out. Returns the
    /// number of cards actually dealt (1, or 0 when both piles are empty).
    pub fn deal_one_card(&mut self) -> usize {
        let recycled = if self.stock.is_empty() && !self.waste.is_empty() {
            self.stock = self
                .waste
                .drain(..)
                .rev()
                .map(|mut card| {
                    card.face_up = false;
                    card
                })
                .collect();
            true
        } else {
            false
        };

        match self.stock.pop() {
            Some(mut card) => {
                card.face_up = true;
                self.waste.push(card);
                self.undo.push(UndoGroup::single(UndoOp::Deal { recycled }));
                1
            }
            None => 0,
        }
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn increment_move_counter(&mut self, n: u32) {
        self.move_count += n;
    }

    /// Marks the game finished when every foundation is complete.
    /// Returns the finished flag either way.
    pub fn check_win(&mut self) -> bool {
        if self
            .foundations
            .iter()
            .all(|pile| pile.len() == RANKS as usize)
        {
            self.finished = true;
        }
        self.finished
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
