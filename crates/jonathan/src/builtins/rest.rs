//! Implementation of the rest() builtin function.

use std::rc::Rc;

use super::{expect_arity, expect_array};
use crate::error::RunResult;
use crate::value::Value;

/// Returns a new array holding every element but the first, or `null` when
/// the array is empty.
pub fn builtin_rest(args: &[Value]) -> RunResult<Value> {
    expect_arity(args, 1)?;
    let elements = expect_array("rest", &args[0])?;
    if elements.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Array(Rc::new(elements[1..].to_vec())))
}
