//! Implementation of the len() builtin function.

use super::expect_arity;
use crate::error::{runtime_err, RunResult};
use crate::value::Value;

/// Returns the number of bytes in a string or elements in an array.
pub fn builtin_len(args: &[Value]) -> RunResult<Value> {
    expect_arity(args, 1)?;
    match &args[0] {
        Value::Str(value) => Ok(Value::Integer(value.len() as i64)),
        Value::Array(elements) => Ok(Value::Integer(elements.len() as i64)),
        other => runtime_err!("argument to `len` not supported, got {}", other.type_tag()),
    }
}
