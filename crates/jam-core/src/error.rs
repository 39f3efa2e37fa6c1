//! Error types for the scripting bridge.

use rhai::{EvalAltResult, Position};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ScriptError`].
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Everything that can go wrong while running a script.
///
/// Load failures are returned to whoever asked for the load. Tick and event
/// failures are contained by the script host and only reported.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    /// The script file could not be read, compiled or executed.
    #[error("error loading {}: {message}", path.display())]
    LoadExecFailed { path: PathBuf, message: String },

    /// The script ran but did not evaluate to an object map.
    #[error("{} did not return a map (got {found})", path.display())]
    NotATable { path: PathBuf, found: String },

    /// The `init` handler raised.
    #[error("init() failed: {0}")]
    InitFailed(String),

    /// The `tick` handler raised.
    #[error("tick() failed: {0}")]
    TickFailed(String),

    /// An event handler raised.
    #[error("{handler}() failed: {message}")]
    EventFailed { handler: String, message: String },

    /// A capability operation got an argument it cannot interpret.
    #[error("bad argument #{position} to '{function}' ({message})")]
    CapabilityArgError {
        function: &'static str,
        position: usize,
        message: String,
    },
}

impl ScriptError {
    /// Whether this failure happened while loading a script.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ScriptError::LoadExecFailed { .. } | ScriptError::NotATable { .. } | ScriptError::InitFailed(_)
        )
    }

    /// Convert into a runtime error raised inside the interpreter.
    pub fn into_eval_error(self) -> Box<EvalAltResult> {
        Box::new(EvalAltResult::ErrorRuntime(self.to_string().into(), Position::NONE))
    }
}
