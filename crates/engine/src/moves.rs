use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::game::{Game, StackId};

/// One reversible primitive inside an undo group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum UndoOp {
    Relocate {
        from: StackId,
        to: StackId,
        count: usize,
    },
    Flip {
        stack: StackId,
    },
    Deal {
        recycled: bool,
    },
}

/// All primitives committed since the last `begin_move` call. Undoing
/// pops the whole group, so a move plus its exposed-card flip reverse
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoGroup {
    pub(crate) ops: Vec<UndoOp>,
}

impl UndoGroup {
    pub(crate) fn single(op: UndoOp) -> Self {
        Self { ops: vec![op] }
    }
}

impl Game {
    /// Opens a fresh undoable group; subsequent `commit_move`/`flip_top`
    /// calls append to it until the next `begin_move`.
    pub fn begin_move(&mut self) {
        self.undo.push(UndoGroup { ops: Vec::new() });
    }

    fn record(&mut self, op: UndoOp) {
        match self.undo.last_mut() {
            Some(group) => group.ops.push(op),
            None => self.undo.push(UndoGroup::single(op)),
        }
    }

    /// Longest run of cards currently liftable off the top of `from` as
    /// one unit. Tableau piles yield their longest face-up
    /// alternating-color descending suffix; waste and foundations yield
    /// at most their single top card; the stock yields nothing.
    pub fn movable_run_len(&self, from: StackId) -> usize {
        let pile = self.pile(from);
        match from {
            StackId::Stock => 0,
            StackId::Waste | StackId::Foundation(_) => pile.len().min(1),
            StackId::Tableau(_) => {
                let mut len = 0;
                for pair in pile.windows(2).rev() {
                    let (below, above) = (pair[0], pair[1]);
                    if len == 0 {
                        if !above.face_up {
                            return 0;
                        }
                        len = 1;
                    }
                    if below.face_up
                        && below.color_red() != above.color_red()
                        && below.rank == above.rank + 1
                    {
                        len += 1;
                    } else {
                        return len;
                    }
                }
                // Single-card pile, or the run reached the pile bottom.
                if len == 0 {
                    usize::from(pile.last().map(|c| c.face_up).unwrap_or(false))
                } else {
                    len
                }
            }
        }
    }

    /// Finds the first destination in `dests` that legally accepts cards
    /// from `from`, preferring the longest liftable run that fits.
    /// Returns the winning destination and the number of cards to move.
    pub fn can_drop(&self, from: StackId, dests: &[StackId]) -> Option<(StackId, usize)> {
        let avail = self.movable_run_len(from);
        if avail == 0 {
            return None;
        }
        let pile = self.pile(from);

        for &dst in dests {
            if dst == from || !self.pile_accepts_drops(dst) {
                continue;
            }
            match dst {
                StackId::Foundation(_) => {
                    let card = pile[pile.len() - 1];
                    if can_stack_foundation(self.top(dst).as_ref(), card) {
                        return Some((dst, 1));
                    }
                }
                StackId::Tableau(_) => {
                    for count in (1..=avail).rev() {
                        let first = pile[pile.len() - count];
                        if can_stack_tableau(self.top(dst).as_ref(), first) {
                            return Some((dst, count));
                        }
                    }
                }
                StackId::Stock | StackId::Waste => {}
            }
        }
        None
    }

    fn pile_accepts_drops(&self, dst: StackId) -> bool {
        dst.is_valid() && matches!(dst, StackId::Foundation(_) | StackId::Tableau(_))
    }

    /// Relocates the top `count` cards of `from` onto `to`, preserving
    /// order, and records the undo primitive. Legality is the caller's
    /// contract (see `can_drop`); an impossible request is a no-op.
    pub fn commit_move(&mut self, from: StackId, count: usize, to: StackId) {
        if !from.is_valid() || !to.is_valid() || from == to {
            return;
        }
        let moved = {
            let Some(src) = self.pile_mut(from) else { return };
            if count == 0 || count > src.len() {
                return;
            }
            let cut = src.len() - count;
            src.split_off(cut)
        };
        let Some(dst) = self.pile_mut(to) else { return };
        dst.extend(moved);
        self.record(UndoOp::Relocate { from, to, count });
    }

    pub fn can_flip_top(&self, stack: StackId) -> bool {
        matches!(stack, StackId::Tableau(_))
            && self.top(stack).map(|card| !card.face_up).unwrap_or(false)
    }

    pub fn flip_top(&mut self, stack: StackId) {
        if !self.can_flip_top(stack) {
            return;
        }
        if let Some(card) = self.pile_mut(stack).and_then(|pile| pile.last_mut()) {
            card.face_up = true;
        }
        self.record(UndoOp::Flip { stack });
    }

    /// Reverses the most recent undo group. Returns false when there is
    /// nothing left to undo.
    pub fn undo_last(&mut self) -> bool {
        let group = loop {
            match self.undo.pop() {
                Some(group) if group.ops.is_empty() => continue,
                Some(group) => break group,
                None => return false,
            }
        };
        for op in group.ops.into_iter().rev() {
            self.reverse(op);
        }
        true
    }

    fn reverse(&mut self, op: UndoOp) {
        match op {
            UndoOp::Relocate { from, to, count } => {
                let moved = {
                    let Some(dst) = self.pile_mut(to) else { return };
                    if count > dst.len() {
                        return;
                    }
                    let cut = dst.len() - count;
                    dst.split_off(cut)
                };
                if let Some(src) = self.pile_mut(from) {
                    src.extend(moved);
                }
            }
            UndoOp::Flip { stack } => {
                if let Some(card) = self.pile_mut(stack).and_then(|pile| pile.last_mut()) {
                    card.face_up = false;
                }
            }
            UndoOp::Deal { recycled } => {
                if let Some(mut card) = self.waste.pop() {
                    card.face_up = false;
                    self.stock.push(card);
                }
                if recycled {
                    self.waste = self
                        .stock
                        .drain(..)
                        .rev()
                        .map(|mut card| {
                            card.face_up = true;
                            card
                        })
                        .collect();
                }
            }
        }
    }
}

pub(crate) fn can_stack_foundation(top: Option<&Card>, card: Card) -> bool {
    match top {
        None => card.rank == 0,
        Some(top_card) => top_card.suit == card.suit && card.rank == top_card.rank + 1,
    }
}

pub(crate) fn can_stack_tableau(top: Option<&Card>, card: Card) -> bool {
    match top {
        None => card.rank == 12,
        Some(top_card) => {
            top_card.face_up
                && top_card.color_red() != card.color_red()
                && top_card.rank == card.rank + 1
        }
    }
}
