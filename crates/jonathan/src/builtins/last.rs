//! Implementation of the last() builtin function.

use super::{expect_arity, expect_array};
use crate::error::RunResult;
use crate::value::Value;

/// Returns the last element of an array, or `null` when it is empty.
pub fn builtin_last(args: &[Value]) -> RunResult<Value> {
    expect_arity(args, 1)?;
    let elements = expect_array("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(Value::Null))
}
