use std::fmt;

use cardtable_engine::game::TABLEAU_COLUMNS;

use crate::context::STEP_BUDGET;

/// Everything that can abort an API call from inside a script run.
///
/// Faults convert into `mlua::Error::RuntimeError` at the API boundary,
/// so they flow through Lua like any other runtime error and pick up
/// script-line attribution in the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFault {
    /// `move` found no legal, unrepeated source/destination pair.
    NoLegalMove,
    /// `column(i)` outside the tableau.
    ColumnOutOfRange { index: i64 },
    /// A single-stack query was handed a stack set.
    NotSingleStack { callable: &'static str },
    /// Suit selector outside `ANY, CLUB, SPADE, HEART, DIAMOND`.
    InvalidSuitSelector { value: i64 },
    /// The run's step budget is spent.
    BudgetExceeded,
    /// The game was already won when the call arrived.
    GameFinished,
}

impl fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptFault::NoLegalMove => {
                write!(f, "Can't move any cards between those stacks")
            }
            ScriptFault::ColumnOutOfRange { index } => {
                write!(
                    f,
                    "column {index} is out of range (valid columns are 0..{})",
                    TABLEAU_COLUMNS - 1
                )
            }
            ScriptFault::NotSingleStack { callable } => {
                write!(f, "{callable} expects a single stack, not a stack set")
            }
            ScriptFault::InvalidSuitSelector { value } => {
                write!(
                    f,
                    "invalid suit selector {value} (use ANY, CLUB, SPADE, HEART or DIAMOND)"
                )
            }
            ScriptFault::BudgetExceeded => {
                write!(f, "move budget exceeded ({STEP_BUDGET} steps per run)")
            }
            ScriptFault::GameFinished => {
                write!(f, "the game is already finished")
            }
        }
    }
}

impl From<ScriptFault> for mlua::Error {
    fn from(fault: ScriptFault) -> Self {
        mlua::Error::RuntimeError(fault.to_string())
    }
}
