//! Lua automation engine for CardTable.
//!
//! # Architecture
//!
//! The scripting system follows a strict separation:
//!
//! 1. **ScriptRuntime** owns the sandboxed `mlua::Lua` for one run
//! 2. **Bridge** (internal) is the only interface scripts have to the game
//! 3. **RunContext** carries the run-scoped step counter and visited set
//! 4. **SnapshotManager** persists the game around each run
//! 5. **ScriptSession** ties the cycle together for the shell
//!
//! # Critical Rule
//!
//! **Scripts never touch piles directly.**
//!
//! Every game-facing global delegates to the engine's move primitives
//! through the bridge, so the engine's undo log and win bookkeeping
//! stay coherent no matter what a script does.
//!
//! # Safety Guarantees
//!
//! - **Sandboxed**: no OS/file/network access, no `load`
//! - **Bounded**: 400 accepted moves per run, 5K log lines
//! - **Gated**: every call aborts once the game is won
//! - **Unrepeatable**: stack-set moves skip already-visited board states
//! - **Recoverable**: the pre-run snapshot restores on demand

mod api;
mod console;
pub mod context;
pub mod fault;
pub mod fingerprint;
mod runtime;
pub mod session;
pub mod snapshot;
mod stacks;

pub use console::{RunLog, MAX_LOG_LINES};
pub use context::{RunContext, STEP_BUDGET};
pub use fault::ScriptFault;
pub use fingerprint::{board_fingerprint, fingerprint_after_move};
pub use runtime::ScriptError;
pub use session::{RunReport, ScriptSession};
pub use snapshot::SnapshotManager;
pub use stacks::{PileHandle, StackSel};
