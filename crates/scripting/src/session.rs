//! One scripting session around a live game.
//!
//! The shell owns the script text buffer through `set_script_text`; the
//! session snapshots the game before every run so a failed script can
//! be replayed from the same point, and tears its snapshot slot down
//! when the session ends.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use cardtable_engine::codec::CodecError;
use cardtable_engine::game::Game;

use crate::api::Bridge;
use crate::console::RunLog;
use crate::runtime::{ScriptError, ScriptRuntime};
use crate::snapshot::SnapshotManager;

/// What one run produced: the terminal fault, if any, and the number of
/// elementary moves accepted. User-visible output went to the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub error: Option<ScriptError>,
    pub steps: usize,
}

impl RunReport {
    pub fn completed(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ScriptSession {
    game: Rc<RefCell<Game>>,
    script: String,
    log: Rc<RefCell<RunLog>>,
    snapshots: SnapshotManager,
}

impl ScriptSession {
    pub fn new(game: Game) -> Self {
        Self::with_snapshots(game, SnapshotManager::for_session())
    }

    pub fn with_snapshots(game: Game, snapshots: SnapshotManager) -> Self {
        Self {
            game: Rc::new(RefCell::new(game)),
            script: String::new(),
            log: Rc::new(RefCell::new(RunLog::new())),
            snapshots,
        }
    }

    /// Installs the shell's log-append callback.
    pub fn set_log_sink(&mut self, sink: Box<dyn FnMut(&str)>) {
        self.log.borrow_mut().set_sink(sink);
    }

    pub fn set_script_text(&mut self, text: impl Into<String>) {
        self.script = text.into();
    }

    pub fn script_text(&self) -> &str {
        &self.script
    }

    pub fn game(&self) -> Ref<'_, Game> {
        self.game.borrow()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.borrow().lines().to_vec()
    }

    /// One full run cycle: snapshot the game, reset the run state,
    /// clear the log, execute the current script text. Faults end the
    /// run and land in the log; committed side effects stay until the
    /// user restores.
    pub fn run(&mut self) -> RunReport {
        if let Err(err) = self.snapshots.snapshot(&self.game.borrow()) {
            let message = format!("snapshot failed: {err}");
            let mut log = self.log.borrow_mut();
            log.clear();
            log.append(&message);
            return RunReport {
                error: Some(ScriptError { line: None, message }),
                steps: 0,
            };
        }

        self.log.borrow_mut().clear();
        let bridge = Rc::new(Bridge::new(self.game.clone(), self.log.clone()));
        let error = match ScriptRuntime::new(bridge.clone()) {
            Ok(runtime) => runtime.execute(&self.script),
            Err(err) => Some(ScriptError { line: None, message: err.to_string() }),
        };
        let steps = bridge.steps();

        if let Some(fault) = &error {
            self.log.borrow_mut().append(&fault.render());
        }
        RunReport { error, steps }
    }

    /// Reloads the pre-run snapshot into the live game and clears the
    /// log.
    pub fn restore(&mut self) -> Result<(), CodecError> {
        {
            let mut game = self.game.borrow_mut();
            self.snapshots.restore(&mut game)?;
        }
        self.log.borrow_mut().clear();
        Ok(())
    }

    /// Releases the snapshot slot. Also runs on drop.
    pub fn teardown(&mut self) {
        self.snapshots.teardown();
    }
}

impl Drop for ScriptSession {
    fn drop(&mut self) {
        self.snapshots.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::fingerprint::board_fingerprint;

    fn session_in(dir: &tempfile::TempDir, game: Game) -> ScriptSession {
        let slot = SnapshotManager::at(dir.path().join("snap.json"));
        ScriptSession::with_snapshots(game, slot)
    }

    #[test]
    fn restore_is_idempotent_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));
        let before = board_fingerprint(&session.game());

        // Mutates, then faults; the deal stays committed.
        session.set_script_text("deal_cards()\ncolumn(12)\n");
        let report = session.run();
        assert!(!report.completed());
        assert_ne!(board_fingerprint(&session.game()), before);

        session.restore().unwrap();
        assert_eq!(board_fingerprint(&session.game()), before);
        assert!(session.log_lines().is_empty());
    }

    #[test]
    fn run_reports_fault_in_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));
        session.set_script_text("column(7)");
        let report = session.run();
        let error = report.error.unwrap();
        assert_eq!(error.line, Some(1));
        let lines = session.log_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("line 1:"));
        assert!(lines[0].contains("0..6"));
    }

    #[test]
    fn each_run_starts_with_a_clean_slate() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));

        session.set_script_text("print('first run')");
        assert!(session.run().completed());
        assert_eq!(session.log_lines(), ["first run"]);

        session.set_script_text("print('second run')");
        assert!(session.run().completed());
        assert_eq!(session.log_lines(), ["second run"]);
    }

    #[test]
    fn script_text_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));
        assert_eq!(session.script_text(), "");
        session.set_script_text("deal_cards()");
        assert_eq!(session.script_text(), "deal_cards()");
    }

    #[test]
    fn log_sink_receives_lines_as_they_appear() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let tap = seen.clone();
        session.set_log_sink(Box::new(move |line| tap.borrow_mut().push(line.to_string())));

        session.set_script_text("print('one')\nprint('two')");
        assert!(session.run().completed());
        assert_eq!(seen.borrow().as_slice(), ["one", "two"]);
    }

    #[test]
    fn teardown_releases_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let slot_path: PathBuf = dir.path().join("snap.json");
        let mut session = session_in(&dir, Game::deal_seeded(5));
        session.set_script_text("print('x')");
        let _ = session.run();
        assert!(slot_path.exists());
        session.teardown();
        assert!(!slot_path.exists());
    }

    #[test]
    fn drop_releases_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let slot_path: PathBuf = dir.path().join("snap.json");
        {
            let mut session = session_in(&dir, Game::deal_seeded(5));
            session.set_script_text("print('x')");
            let _ = session.run();
            assert!(slot_path.exists());
        }
        assert!(!slot_path.exists());
    }

    #[test]
    fn failed_move_leaves_the_board_alone() {
        use cardtable_engine::card::{Card, Suit};

        let dir = tempfile::tempdir().unwrap();
        // Empty column 0; the waste holds a 2 of clubs, which has no
        // legal drop anywhere.
        let game = Game::from_piles(
            Vec::new(),
            vec![Card { suit: Suit::Club, rank: 1, face_up: true }],
            Default::default(),
            Default::default(),
        );
        let mut session = session_in(&dir, game);

        session.set_script_text("print(check_top(waste(), 2, CLUB))");
        assert!(session.run().completed());
        assert_eq!(session.log_lines(), ["true"]);

        session.set_script_text("move(waste(), column(0))");
        let report = session.run();
        let error = report.error.unwrap();
        assert!(error.message.starts_with("Can't move"));

        session.set_script_text("print(check_top(waste(), 2, CLUB))");
        assert!(session.run().completed());
        assert_eq!(session.log_lines(), ["true"]);
    }

    #[test]
    fn steps_count_accepted_moves_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, Game::deal_seeded(5));
        session.set_script_text(
            "deal_cards()\ncheck_move(tableau(), foundation())\ndeal_cards()",
        );
        let report = session.run();
        assert!(report.completed());
        assert_eq!(report.steps, 2);
    }
}
