//! Plain-text board rendering for the `show` command.

use cardtable_engine::card::Card;
use cardtable_engine::game::{Game, StackId, FOUNDATION_PILES, TABLEAU_COLUMNS};

fn card_cell(card: &Card) -> String {
    if card.face_up {
        card.label()
    } else {
        "##".to_string()
    }
}

fn top_cell(game: &Game, id: StackId) -> String {
    game.top(id)
        .map(|card| card_cell(&card))
        .unwrap_or_else(|| "--".to_string())
}

pub fn render_board(game: &Game) -> String {
    let mut out = String::new();

    out.push_str(&format!("stock: {} cards\n", game.size(StackId::Stock)));
    out.push_str(&format!("waste: {}\n", top_cell(game, StackId::Waste)));

    let foundations: Vec<String> = (0..FOUNDATION_PILES)
        .map(|i| top_cell(game, StackId::Foundation(i as u8)))
        .collect();
    out.push_str(&format!("foundations: {}\n", foundations.join(" ")));

    for col in 0..TABLEAU_COLUMNS {
        let pile = game.pile(StackId::Tableau(col as u8));
        let cells: Vec<String> = pile.iter().map(card_cell).collect();
        if cells.is_empty() {
            out.push_str(&format!("t{col}: --\n"));
        } else {
            out.push_str(&format!("t{col}: {}\n", cells.join(" ")));
        }
    }

    out.push_str(&format!("moves: {}\n", game.move_count()));
    out
}
