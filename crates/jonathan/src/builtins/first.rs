//! Implementation of the first() builtin function.

use super::{expect_arity, expect_array};
use crate::error::RunResult;
use crate::value::Value;

/// Returns the first element of an array, or `null` when it is empty.
pub fn builtin_first(args: &[Value]) -> RunResult<Value> {
    expect_arity(args, 1)?;
    let elements = expect_array("first", &args[0])?;
    Ok(elements.first().cloned().unwrap_or(Value::Null))
}
