//! Error types for the three failure surfaces: parse diagnostics live as
//! plain strings on the parser; compilation and execution get the types
//! below. User code cannot catch any of these.

use std::borrow::Cow;
use std::fmt;

/// Error raised while lowering an AST to bytecode.
///
/// Compilation aborts at the first error: either a name failed to resolve or
/// an internal emission limit was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    message: Cow<'static, str>,
}

impl CompileError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompileError {}

/// Error raised during execution, by either engine.
///
/// Execution stops at the first runtime error; user code cannot catch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// `ERROR: <msg>`, the display form for error values.
    #[must_use]
    pub fn inspect(&self) -> String {
        format!("ERROR: {}", self.message)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Shorthand for `Err(RuntimeError::new(format!(…)))`, used all over the VM,
/// evaluator and builtins.
macro_rules! runtime_err {
    ($($arg:tt)*) => {
        Err($crate::error::RuntimeError::new(format!($($arg)*)))
    };
}
pub(crate) use runtime_err;

pub type RunResult<T> = Result<T, RuntimeError>;
