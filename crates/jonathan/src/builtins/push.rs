//! Implementation of the push() builtin function.

use std::rc::Rc;

use super::{expect_arity, expect_array};
use crate::error::RunResult;
use crate::value::Value;

/// Returns a new array with the value appended. The input array is shared
/// and never mutated.
pub fn builtin_push(args: &[Value]) -> RunResult<Value> {
    expect_arity(args, 2)?;
    let elements = expect_array("push", &args[0])?;
    let mut pushed = elements.to_vec();
    pushed.push(args[1].clone());
    Ok(Value::Array(Rc::new(pushed)))
}
