//! Sandboxed Lua runtime for one script run.
//!
//! A fresh `mlua::Lua` is built per run: dangerous globals are stripped,
//! the curated API surface is registered, and nothing else is reachable
//! from script code. Execution is synchronous on the calling thread; the
//! only things that stop a script are its own completion, a fault, the
//! step budget, and the finished-game gate.
//!
//! Faults are mapped back to the offending script line by walking the
//! error chain and the Lua traceback for the innermost frame that lives
//! in the script chunk itself (API frames are `[C]` frames and never
//! match).

use std::rc::Rc;

use mlua::{Lua, Result as LuaResult, Value};

use crate::api::{self, Bridge};

/// Name the script chunk is loaded under; fault attribution keys on it.
const CHUNK_NAME: &str = "script";

/// Globals removed from the environment before any script runs.
/// Everything else the script sees is the API surface plus Lua's pure
/// computation libraries (string, table, math).
const STRIPPED_GLOBALS: [&str; 8] = [
    "os", "io", "debug", "package", "require", "loadfile", "dofile", "load",
];

/// A fault surfaced to the user: best-effort script line plus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub line: Option<usize>,
    pub message: String,
}

impl ScriptError {
    pub fn render(&self) -> String {
        match self.line {
            Some(line) => format!("line {line}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

pub(crate) struct ScriptRuntime {
    lua: Lua,
}

impl ScriptRuntime {
    pub(crate) fn new(bridge: Rc<Bridge>) -> LuaResult<Self> {
        let lua = Lua::new();
        let globals = lua.globals();
        for name in STRIPPED_GLOBALS {
            globals.set(name, Value::Nil)?;
        }
        api::register(&lua, bridge)?;
        Ok(Self { lua })
    }

    /// Compiles and runs the script text. A syntax error reports before
    /// anything executes; a runtime fault reports after whatever side
    /// effects already committed (Restore exists for that).
    pub(crate) fn execute(&self, text: &str) -> Option<ScriptError> {
        let chunk = self.lua.load(text).set_name(CHUNK_NAME);
        let func = match chunk.into_function() {
            Ok(func) => func,
            Err(err) => return Some(attribute(&err)),
        };
        match func.call::<()>(()) {
            Ok(()) => None,
            Err(err) => Some(attribute(&err)),
        }
    }
}

/// Maps an mlua error onto a script line + message.
fn attribute(error: &mlua::Error) -> ScriptError {
    match error {
        mlua::Error::SyntaxError { message, .. } => split_position(message),
        mlua::Error::RuntimeError(message) => split_position(message),
        mlua::Error::CallbackError { traceback, cause } => {
            let inner = attribute(cause);
            if inner.line.is_some() {
                inner
            } else {
                ScriptError {
                    line: script_frame_line(traceback),
                    message: inner.message,
                }
            }
        }
        other => ScriptError {
            line: None,
            message: other.to_string(),
        },
    }
}

/// Splits the `[string "script"]:N:` position prefix Lua bakes into
/// messages raised from script code.
fn split_position(message: &str) -> ScriptError {
    let needle = format!("[string \"{CHUNK_NAME}\"]:");
    if let Some(idx) = message.find(&needle) {
        let rest = &message[idx + needle.len()..];
        if let Some((line, tail)) = rest.split_once(':') {
            if let Ok(line) = line.parse::<usize>() {
                // Lua may append its own traceback after the message;
                // keep the first line only.
                let tail = tail.trim_start();
                let message = tail.lines().next().unwrap_or(tail);
                return ScriptError {
                    line: Some(line),
                    message: message.to_string(),
                };
            }
        }
    }
    ScriptError {
        line: None,
        message: message.lines().next().unwrap_or(message).to_string(),
    }
}

/// Finds the innermost traceback frame that lives in the script chunk.
fn script_frame_line(traceback: &str) -> Option<usize> {
    let needle = format!("[string \"{CHUNK_NAME}\"]:");
    for frame in traceback.lines() {
        if let Some(idx) = frame.find(&needle) {
            let digits: String = frame[idx + needle.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(line) = digits.parse() {
                return Some(line);
            }
        }
    }
    None
}
