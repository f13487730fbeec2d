//! Board fingerprints for repetition detection.
//!
//! A fingerprint summarizes the visible board: the top card (or
//! emptiness) of every tableau column, every foundation, and the waste,
//! in that fixed order. Two boards with equal fingerprints count as the
//! same state for repetition checks. Only top cards are compared, not
//! full pile contents.

use cardtable_engine::card::Card;
use cardtable_engine::game::{Game, StackId, FOUNDATION_PILES, TABLEAU_COLUMNS};

fn enumeration_order() -> impl Iterator<Item = StackId> {
    (0..TABLEAU_COLUMNS)
        .map(|i| StackId::Tableau(i as u8))
        .chain((0..FOUNDATION_PILES).map(|i| StackId::Foundation(i as u8)))
        .chain(std::iter::once(StackId::Waste))
}

fn push_entry(out: &mut String, top: Option<&Card>) {
    match top {
        Some(card) => {
            out.push(card.suit.letter());
            out.push_str(&card.rank.to_string());
        }
        None => out.push_str("-1"),
    }
    out.push(',');
}

/// Fingerprint of the board as it stands. O(number of stacks).
pub fn board_fingerprint(game: &Game) -> String {
    let mut out = String::new();
    for id in enumeration_order() {
        push_entry(&mut out, game.pile(id).last());
    }
    out
}

/// Fingerprint the board would have after moving the top `count` cards
/// of `from` onto `to`, computed without touching any pile.
///
/// The source contributes the card that would become its new top (or
/// the empty marker when the move drains it); the destination
/// contributes the source's current top card, which lands on top after
/// the transfer; every other stack contributes its current top.
pub fn fingerprint_after_move(game: &Game, from: StackId, count: usize, to: StackId) -> String {
    let source = game.pile(from);
    let landing = source.last();
    let exposed = if count >= source.len() {
        None
    } else {
        source.get(source.len() - count - 1)
    };

    let mut out = String::new();
    for id in enumeration_order() {
        let top = if id == from {
            exposed
        } else if id == to {
            landing
        } else {
            game.pile(id).last()
        };
        push_entry(&mut out, top);
    }
    out
}
