//! The curated API surface scripts run against.
//!
//! Scripts never touch piles directly. Every game-facing global
//! registered here goes through the [`Bridge`]: the finished-game gate
//! runs first on every call, mutating calls check the step budget
//! before acting, and committed moves feed the run's visited-state set
//! so `move` over stack sets refuses to revisit a board it has already
//! produced this run.

use std::cell::RefCell;
use std::rc::Rc;

use cardtable_engine::card::Suit;
use cardtable_engine::game::{Game, StackId, FOUNDATION_PILES, TABLEAU_COLUMNS};
use mlua::{Lua, Result as LuaResult, UserDataRef, Value, Variadic};

use crate::console::RunLog;
use crate::context::RunContext;
use crate::fault::ScriptFault;
use crate::fingerprint::fingerprint_after_move;
use crate::stacks::{PileHandle, StackSel};

/// Script-side suit selector constants. `ANY` matches every suit; the
/// rest are the engine's suit indexes.
pub const ANY: i64 = -1;
pub const CLUB: i64 = 0;
pub const SPADE: i64 = 1;
pub const HEART: i64 = 2;
pub const DIAMOND: i64 = 3;

/// Everything one run's API calls operate on: the live game, the
/// run-scoped context, and the run log. Closures registered into the
/// Lua environment share a single `Rc<Bridge>`.
pub(crate) struct Bridge {
    game: Rc<RefCell<Game>>,
    ctx: RefCell<RunContext>,
    log: Rc<RefCell<RunLog>>,
}

impl Bridge {
    pub(crate) fn new(game: Rc<RefCell<Game>>, log: Rc<RefCell<RunLog>>) -> Self {
        Self {
            game,
            ctx: RefCell::new(RunContext::new()),
            log,
        }
    }

    pub(crate) fn steps(&self) -> usize {
        self.ctx.borrow().steps()
    }

    /// The finished-game gate. Wraps every exposed callable uniformly:
    /// once the game is won, any further API call aborts the run.
    fn ensure_live(&self) -> Result<(), ScriptFault> {
        if self.game.borrow().is_finished() {
            Err(ScriptFault::GameFinished)
        } else {
            Ok(())
        }
    }

    fn single(sel: &StackSel, callable: &'static str) -> Result<StackId, ScriptFault> {
        match sel {
            StackSel::Single(id) => Ok(*id),
            StackSel::Many(_) => Err(ScriptFault::NotSingleStack { callable }),
        }
    }

    fn deal(&self) -> Result<usize, ScriptFault> {
        self.ensure_live()?;
        self.ctx.borrow().ensure_budget()?;
        let dealt = self.game.borrow_mut().deal_one_card();
        if dealt > 0 {
            self.ctx.borrow_mut().charge_step();
        }
        let noun = if dealt == 1 { "card" } else { "cards" };
        self.log.borrow_mut().append(&format!("Dealt {dealt} {noun}"));
        Ok(dealt)
    }

    /// Relocates the best legal run between the given stack selections.
    ///
    /// Sources are tried in enumeration order and the first one with a
    /// legal drop wins. When `from` is a stack set, a winner whose
    /// predicted fingerprint was already reached this run is skipped
    /// and the next source tried; a single named source never consults
    /// the visited set. That asymmetry is intentional.
    fn do_move(&self, from: &StackSel, to: &StackSel) -> Result<(), ScriptFault> {
        self.ensure_live()?;
        self.ctx.borrow().ensure_budget()?;

        let mut game = self.game.borrow_mut();
        let dests = to.candidates();
        for &src in from.candidates() {
            let Some((dst, count)) = game.can_drop(src, dests) else {
                continue;
            };
            let fingerprint = fingerprint_after_move(&game, src, count, dst);
            if from.is_many() && self.ctx.borrow().was_visited(&fingerprint) {
                continue;
            }

            game.begin_move();
            game.commit_move(src, count, dst);
            if game.can_flip_top(src) {
                game.flip_top(src);
            }
            game.increment_move_counter(1);
            game.check_win();

            let mut ctx = self.ctx.borrow_mut();
            ctx.charge_step();
            ctx.mark_visited(fingerprint);
            return Ok(());
        }
        Err(ScriptFault::NoLegalMove)
    }

    /// Same resolution as `do_move`, zero mutation. Never touches the
    /// step counter or the visited set.
    fn check_move(&self, from: &StackSel, to: &StackSel) -> Result<bool, ScriptFault> {
        self.ensure_live()?;

        let game = self.game.borrow();
        let dests = to.candidates();
        if let StackSel::Single(src) = from {
            return Ok(game.can_drop(*src, dests).is_some());
        }
        for &src in from.candidates() {
            if let Some((dst, count)) = game.can_drop(src, dests) {
                let fingerprint = fingerprint_after_move(&game, src, count, dst);
                if self.ctx.borrow().was_visited(&fingerprint) {
                    continue;
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn undo(&self) -> Result<(), ScriptFault> {
        self.ensure_live()?;
        self.game.borrow_mut().undo_last();
        Ok(())
    }

    fn check_size(&self, sel: &StackSel) -> Result<usize, ScriptFault> {
        self.ensure_live()?;
        let id = Self::single(sel, "check_size")?;
        Ok(self.game.borrow().size(id))
    }

    fn check_face_up_size(&self, sel: &StackSel) -> Result<usize, ScriptFault> {
        self.ensure_live()?;
        let id = Self::single(sel, "check_face_up_size")?;
        Ok(self.game.borrow().face_up_size(id))
    }

    fn check_face_down_size(&self, sel: &StackSel) -> Result<usize, ScriptFault> {
        self.ensure_live()?;
        let id = Self::single(sel, "check_face_down_size")?;
        Ok(self.game.borrow().face_down_size(id))
    }

    /// True when any face-up card in the stack matches. Ranks arrive
    /// 1-based from the script and convert here.
    fn check_exists(&self, sel: &StackSel, rank: i64, suit: i64) -> Result<bool, ScriptFault> {
        self.ensure_live()?;
        let id = Self::single(sel, "check_exists")?;
        let wanted = parse_suit_selector(suit)?;
        let rank0 = rank - 1;
        Ok(self.game.borrow().pile(id).iter().any(|card| {
            card.face_up
                && i64::from(card.rank) == rank0
                && wanted.map(|s| s == card.suit).unwrap_or(true)
        }))
    }

    /// True when the stack's top card matches, face up or not.
    fn check_top(&self, sel: &StackSel, rank: i64, suit: i64) -> Result<bool, ScriptFault> {
        self.ensure_live()?;
        let id = Self::single(sel, "check_top")?;
        let wanted = parse_suit_selector(suit)?;
        let rank0 = rank - 1;
        Ok(self.game.borrow().top(id).map_or(false, |card| {
            i64::from(card.rank) == rank0 && wanted.map(|s| s == card.suit).unwrap_or(true)
        }))
    }

    fn print(&self, values: &[Value]) -> Result<(), ScriptFault> {
        self.ensure_live()?;
        let line = values
            .iter()
            .map(value_display)
            .collect::<Vec<_>>()
            .join("\t");
        self.log.borrow_mut().append(&line);
        Ok(())
    }
}

fn parse_suit_selector(value: i64) -> Result<Option<Suit>, ScriptFault> {
    match value {
        ANY => Ok(None),
        0..=3 => Ok(Suit::from_index(value as usize)),
        _ => Err(ScriptFault::InvalidSuitSelector { value }),
    }
}

fn foundation_set() -> StackSel {
    StackSel::Many((0..FOUNDATION_PILES).map(|i| StackId::Foundation(i as u8)).collect())
}

fn tableau_set() -> StackSel {
    StackSel::Many((0..TABLEAU_COLUMNS).map(|i| StackId::Tableau(i as u8)).collect())
}

/// Convert a Lua value to a display string for the run log.
fn value_display(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{:.0}", n)
            } else {
                format!("{}", n)
            }
        }
        Value::String(s) => s
            .to_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|_| "<invalid utf8>".to_string()),
        Value::Table(_) => "table".to_string(),
        Value::Function(_) => "function".to_string(),
        Value::UserData(_) => "stack".to_string(),
        other => format!("{other:?}"),
    }
}

/// Registers the full API surface into `lua`'s globals. These names are
/// the user-visible contract; nothing else game-facing is exposed.
pub(crate) fn register(lua: &Lua, bridge: Rc<Bridge>) -> LuaResult<()> {
    let globals = lua.globals();

    // ========================================================================
    // waste() / foundation() / tableau() / column(i) -> stack handles
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "waste",
            lua.create_function(move |_, ()| {
                b.ensure_live()?;
                Ok(PileHandle(StackSel::Single(StackId::Waste)))
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "foundation",
            lua.create_function(move |_, ()| {
                b.ensure_live()?;
                Ok(PileHandle(foundation_set()))
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "tableau",
            lua.create_function(move |_, ()| {
                b.ensure_live()?;
                Ok(PileHandle(tableau_set()))
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "column",
            lua.create_function(move |_, index: i64| {
                b.ensure_live()?;
                if !(0..TABLEAU_COLUMNS as i64).contains(&index) {
                    return Err(ScriptFault::ColumnOutOfRange { index }.into());
                }
                Ok(PileHandle(StackSel::Single(StackId::Tableau(index as u8))))
            })?,
        )?;
    }

    // ========================================================================
    // deal_cards() -> count dealt (also logged)
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "deal_cards",
            lua.create_function(move |_, ()| Ok(b.deal()?))?,
        )?;
    }

    // ========================================================================
    // move(from, to) / check_move(from, to)
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "move",
            lua.create_function(
                move |_, (from, to): (UserDataRef<PileHandle>, UserDataRef<PileHandle>)| {
                    b.do_move(&from.0, &to.0)?;
                    Ok(())
                },
            )?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "check_move",
            lua.create_function(
                move |_, (from, to): (UserDataRef<PileHandle>, UserDataRef<PileHandle>)| {
                    Ok(b.check_move(&from.0, &to.0)?)
                },
            )?,
        )?;
    }

    // ========================================================================
    // undo()
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "undo",
            lua.create_function(move |_, ()| {
                b.undo()?;
                Ok(())
            })?,
        )?;
    }

    // ========================================================================
    // single-stack queries
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "check_size",
            lua.create_function(move |_, stack: UserDataRef<PileHandle>| {
                Ok(b.check_size(&stack.0)?)
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "check_face_up_size",
            lua.create_function(move |_, stack: UserDataRef<PileHandle>| {
                Ok(b.check_face_up_size(&stack.0)?)
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "check_face_down_size",
            lua.create_function(move |_, stack: UserDataRef<PileHandle>| {
                Ok(b.check_face_down_size(&stack.0)?)
            })?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "check_exists",
            lua.create_function(
                move |_, (stack, rank, suit): (UserDataRef<PileHandle>, i64, i64)| {
                    Ok(b.check_exists(&stack.0, rank, suit)?)
                },
            )?,
        )?;
    }
    {
        let b = bridge.clone();
        globals.set(
            "check_top",
            lua.create_function(
                move |_, (stack, rank, suit): (UserDataRef<PileHandle>, i64, i64)| {
                    Ok(b.check_top(&stack.0, rank, suit)?)
                },
            )?,
        )?;
    }

    // ========================================================================
    // print(...) -> run log + diagnostic channel
    // ========================================================================
    {
        let b = bridge.clone();
        globals.set(
            "print",
            lua.create_function(move |_, values: Variadic<Value>| {
                b.print(&values)?;
                Ok(())
            })?,
        )?;
    }

    // Suit selector constants.
    globals.set("ANY", ANY)?;
    globals.set("CLUB", CLUB)?;
    globals.set("SPADE", SPADE)?;
    globals.set("HEART", HEART)?;
    globals.set("DIAMOND", DIAMOND)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtable_engine::card::Card;
    use crate::context::STEP_BUDGET;

    fn up(suit: Suit, rank: u8) -> Card {
        Card { suit, rank, face_up: true }
    }

    fn bridge_over(game: Game) -> Bridge {
        Bridge::new(
            Rc::new(RefCell::new(game)),
            Rc::new(RefCell::new(RunLog::new())),
        )
    }

    /// Column 0 holds 9H+8S, column 1 holds 9D: the 8S can ping-pong
    /// between the two nines forever, which is exactly the shape the
    /// visited-state set exists to stop.
    fn ping_pong_board() -> Game {
        let mut tableau: [Vec<Card>; TABLEAU_COLUMNS] = Default::default();
        tableau[0] = vec![up(Suit::Heart, 8), up(Suit::Spade, 7)];
        tableau[1] = vec![up(Suit::Diamond, 8)];
        Game::from_piles(Vec::new(), Vec::new(), Default::default(), tableau)
    }

    #[test]
    fn move_commits_first_legal_source() {
        let bridge = bridge_over(ping_pong_board());
        let from = tableau_set();
        let to = tableau_set();
        bridge.do_move(&from, &to).unwrap();

        let game = bridge.game.borrow();
        assert_eq!(game.top(StackId::Tableau(1)).map(|c| c.label()), Some("8S".into()));
        assert_eq!(game.size(StackId::Tableau(0)), 1);
        assert_eq!(game.move_count(), 1);
    }

    #[test]
    fn stack_set_moves_refuse_revisited_states() {
        let bridge = bridge_over(ping_pong_board());
        let from = tableau_set();
        let to = tableau_set();

        // 8S to column 1, then back to column 0 (the starting board was
        // never a post-move state, so it is not in the visited set).
        bridge.do_move(&from, &to).unwrap();
        bridge.do_move(&from, &to).unwrap();
        // Both reachable states are now visited; the cycle must break.
        assert_eq!(bridge.do_move(&from, &to), Err(ScriptFault::NoLegalMove));
        assert_eq!(bridge.steps(), 2);
    }

    #[test]
    fn single_source_moves_skip_the_dedup_filter() {
        let bridge = bridge_over(ping_pong_board());
        let c0 = StackSel::Single(StackId::Tableau(0));
        let c1 = StackSel::Single(StackId::Tableau(1));

        // The same two states over and over; a single named source
        // never consults the visited set.
        for _ in 0..3 {
            bridge.do_move(&c0, &c1).unwrap();
            bridge.do_move(&c1, &c0).unwrap();
        }
        assert_eq!(bridge.steps(), 6);
    }

    #[test]
    fn check_move_agrees_with_move_and_never_mutates() {
        let bridge = bridge_over(ping_pong_board());
        let from = tableau_set();
        let to = tableau_set();

        assert!(bridge.check_move(&from, &to).unwrap());
        assert_eq!(bridge.steps(), 0);
        bridge.do_move(&from, &to).unwrap();
        assert!(bridge.check_move(&from, &to).unwrap());
        bridge.do_move(&from, &to).unwrap();

        // check_move applies the same dedup filter for stack sets, so
        // it predicts the no-legal-move fault.
        assert!(!bridge.check_move(&from, &to).unwrap());
        assert_eq!(bridge.do_move(&from, &to), Err(ScriptFault::NoLegalMove));
    }

    #[test]
    fn move_faults_when_nothing_is_legal() {
        let bridge = bridge_over(Game::from_piles(
            Vec::new(),
            vec![up(Suit::Club, 1)], // a 2C cannot go to an empty column
            Default::default(),
            Default::default(),
        ));
        let from = StackSel::Single(StackId::Waste);
        let to = StackSel::Single(StackId::Tableau(0));
        assert!(bridge.check_top(&from, 2, CLUB).unwrap());
        assert_eq!(bridge.do_move(&from, &to), Err(ScriptFault::NoLegalMove));
        // The failed call left the board alone.
        assert!(bridge.check_top(&from, 2, CLUB).unwrap());
        assert_eq!(bridge.steps(), 0);
    }

    #[test]
    fn budget_trips_on_the_next_mutating_call() {
        let bridge = bridge_over(ping_pong_board());
        let c0 = StackSel::Single(StackId::Tableau(0));
        let c1 = StackSel::Single(StackId::Tableau(1));

        for i in 0..STEP_BUDGET {
            let (from, to) = if i % 2 == 0 { (&c0, &c1) } else { (&c1, &c0) };
            bridge.do_move(from, to).unwrap();
        }
        assert_eq!(bridge.steps(), STEP_BUDGET);
        assert_eq!(bridge.do_move(&c0, &c1), Err(ScriptFault::BudgetExceeded));
        // Queries stay open after the budget trips.
        assert!(bridge.check_size(&c0).is_ok());
    }

    #[test]
    fn finished_gate_wraps_every_call() {
        let mut foundations: [Vec<Card>; FOUNDATION_PILES] = Default::default();
        for (i, suit) in Suit::ALL.iter().enumerate() {
            for rank in 0..13 {
                foundations[i].push(up(*suit, rank));
            }
        }
        let mut game =
            Game::from_piles(Vec::new(), Vec::new(), foundations, Default::default());
        game.check_win();
        let bridge = bridge_over(game);

        let waste = StackSel::Single(StackId::Waste);
        assert_eq!(bridge.check_size(&waste), Err(ScriptFault::GameFinished));
        assert_eq!(bridge.deal(), Err(ScriptFault::GameFinished));
        assert_eq!(bridge.print(&[]), Err(ScriptFault::GameFinished));
        assert_eq!(bridge.undo(), Err(ScriptFault::GameFinished));
    }

    #[test]
    fn winning_move_flips_the_gate_for_later_calls() {
        let mut foundations: [Vec<Card>; FOUNDATION_PILES] = Default::default();
        for (i, suit) in Suit::ALL.iter().enumerate() {
            let depth = if *suit == Suit::Spade { 12 } else { 13 };
            for rank in 0..depth {
                foundations[i].push(up(*suit, rank));
            }
        }
        let game = Game::from_piles(
            Vec::new(),
            vec![up(Suit::Spade, 12)], // the king of spades wins it
            foundations,
            Default::default(),
        );
        let bridge = bridge_over(game);

        let from = StackSel::Single(StackId::Waste);
        bridge.do_move(&from, &foundation_set()).unwrap();
        assert!(bridge.game.borrow().is_finished());
        assert_eq!(bridge.print(&[]), Err(ScriptFault::GameFinished));
    }

    #[test]
    fn deal_logs_the_count_and_charges_a_step() {
        let game = Game::from_piles(
            vec![Card { suit: Suit::Club, rank: 4, face_up: false }],
            Vec::new(),
            Default::default(),
            Default::default(),
        );
        let bridge = bridge_over(game);
        assert_eq!(bridge.deal().unwrap(), 1);
        assert_eq!(bridge.steps(), 1);
        assert_eq!(bridge.log.borrow().lines(), ["Dealt 1 card"]);
    }

    #[test]
    fn empty_deal_logs_zero_and_charges_nothing() {
        let bridge = bridge_over(Game::from_piles(
            Vec::new(),
            Vec::new(),
            Default::default(),
            Default::default(),
        ));
        assert_eq!(bridge.deal().unwrap(), 0);
        assert_eq!(bridge.steps(), 0);
        assert_eq!(bridge.log.borrow().lines(), ["Dealt 0 cards"]);
    }

    #[test]
    fn single_stack_queries_reject_stack_sets() {
        let bridge = bridge_over(ping_pong_board());
        let many = tableau_set();
        assert_eq!(
            bridge.check_size(&many),
            Err(ScriptFault::NotSingleStack { callable: "check_size" })
        );
        assert_eq!(
            bridge.check_exists(&many, 1, ANY),
            Err(ScriptFault::NotSingleStack { callable: "check_exists" })
        );
    }

    #[test]
    fn suit_selector_validation() {
        let bridge = bridge_over(ping_pong_board());
        let c0 = StackSel::Single(StackId::Tableau(0));
        assert_eq!(
            bridge.check_exists(&c0, 9, 9),
            Err(ScriptFault::InvalidSuitSelector { value: 9 })
        );
        // ANY matches the concrete suit, the wrong suit does not.
        assert!(bridge.check_exists(&c0, 9, ANY).unwrap());
        assert!(bridge.check_exists(&c0, 9, HEART).unwrap());
        assert!(!bridge.check_exists(&c0, 9, CLUB).unwrap());
    }

    #[test]
    fn ranks_are_one_based_at_the_surface() {
        // Internal rank 7 (an eight) in column 0's top card.
        let bridge = bridge_over(ping_pong_board());
        let c0 = StackSel::Single(StackId::Tableau(0));
        assert!(bridge.check_top(&c0, 8, SPADE).unwrap());
        assert!(!bridge.check_top(&c0, 7, SPADE).unwrap());
    }

    #[test]
    fn moved_card_shows_up_in_check_exists() {
        let bridge = bridge_over(ping_pong_board());
        let c1 = StackSel::Single(StackId::Tableau(1));
        assert!(!bridge.check_exists(&c1, 8, SPADE).unwrap());

        // The 8S lands face up on column 1.
        bridge
            .do_move(&StackSel::Single(StackId::Tableau(0)), &c1)
            .unwrap();
        assert!(bridge.check_exists(&c1, 8, SPADE).unwrap());
        assert!(!bridge.check_exists(&c1, 8, HEART).unwrap());
        assert!(!bridge.check_exists(&c1, 5, SPADE).unwrap());
    }

    #[test]
    fn check_exists_sees_only_face_up_cards() {
        let mut tableau: [Vec<Card>; TABLEAU_COLUMNS] = Default::default();
        tableau[0] = vec![
            Card { suit: Suit::Club, rank: 3, face_up: false },
            up(Suit::Heart, 3),
        ];
        let bridge = bridge_over(Game::from_piles(
            Vec::new(),
            Vec::new(),
            Default::default(),
            tableau,
        ));
        let c0 = StackSel::Single(StackId::Tableau(0));
        assert!(bridge.check_exists(&c0, 4, HEART).unwrap());
        assert!(!bridge.check_exists(&c0, 4, CLUB).unwrap());
        // check_top sees the top card regardless of orientation.
        assert!(bridge.check_top(&c0, 4, HEART).unwrap());
    }

    #[test]
    fn undo_rolls_back_the_last_move() {
        let bridge = bridge_over(ping_pong_board());
        let before = crate::fingerprint::board_fingerprint(&bridge.game.borrow());
        bridge
            .do_move(&StackSel::Single(StackId::Tableau(0)), &StackSel::Single(StackId::Tableau(1)))
            .unwrap();
        bridge.undo().unwrap();
        assert_eq!(
            crate::fingerprint::board_fingerprint(&bridge.game.borrow()),
            before
        );
    }
}
