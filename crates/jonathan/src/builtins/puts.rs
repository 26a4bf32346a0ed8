//! Implementation of the puts() builtin function.

use std::io::Write;

use crate::error::{RunResult, RuntimeError};
use crate::value::Value;

/// Writes each argument's inspect form on its own line and returns `null`.
/// Takes any number of arguments.
pub fn builtin_puts<W: Write>(args: &[Value], output: &mut W) -> RunResult<Value> {
    for arg in args {
        writeln!(output, "{}", arg.inspect())
            .map_err(|e| RuntimeError::new(format!("could not write output: {e}")))?;
    }
    Ok(Value::Null)
}
