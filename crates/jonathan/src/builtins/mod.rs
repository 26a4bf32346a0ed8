//! Builtin functions shared by the compiler, the VM and the evaluator.
//!
//! Each builtin has its own submodule. The enum discriminants are the
//! compile-time builtin indices: the compiler registers them in declaration
//! order and the VM maps a `LoadBuiltin` operand back through `from_repr`,
//! so the two tables can never drift apart.

mod first;
mod last;
mod len;
mod push;
mod puts;
mod rest;

use std::io::Write;

use strum::{Display, EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::error::{runtime_err, RunResult, RuntimeError};
use crate::value::Value;

/// Enumerates every interpreter-native builtin function.
///
/// Uses strum derives for automatic `Display`, `FromStr` and iteration.
/// All variants serialize to lowercase (e.g. `Len` -> "len").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, FromRepr, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Builtin {
    Len,
    Puts,
    First,
    Last,
    Rest,
    Push,
}

impl Builtin {
    /// Executes the builtin with the provided arguments.
    ///
    /// `output` is the sink `puts` writes to; the driver passes stdout and
    /// tests pass a buffer.
    pub fn call<W: Write>(self, args: &[Value], output: &mut W) -> RunResult<Value> {
        match self {
            Self::Len => len::builtin_len(args),
            Self::Puts => puts::builtin_puts(args, output),
            Self::First => first::builtin_first(args),
            Self::Last => last::builtin_last(args),
            Self::Rest => rest::builtin_rest(args),
            Self::Push => push::builtin_push(args),
        }
    }
}

/// Arity check shared by the builtin implementations.
fn expect_arity(args: &[Value], want: usize) -> RunResult<()> {
    if args.len() == want {
        Ok(())
    } else {
        runtime_err!("wrong number of arguments. got={}, want={}", args.len(), want)
    }
}

/// Unwraps the single array argument of `first`/`last`/`rest`.
fn expect_array<'a>(name: &str, arg: &'a Value) -> Result<&'a [Value], RuntimeError> {
    match arg {
        Value::Array(elements) => Ok(elements.as_slice()),
        other => Err(RuntimeError::new(format!(
            "argument to `{name}` must be ARRAY, got {}",
            other.type_tag()
        ))),
    }
}
