//! Runtime value taxonomy shared by both engines.
//!
//! Values have value semantics except functions, arrays and hashes, which
//! are shared references (`Rc`). The language has no mutation operators, so
//! sharing is observationally immutable.

use std::cell::RefCell;
use std::fmt::{self, Write};
use std::rc::Rc;

use indexmap::IndexMap;
use strum::Display;

use crate::ast::BlockStatement;
use crate::builtins::Builtin;
use crate::bytecode::Instructions;
use crate::eval::Environment;

/// Runtime type tags. The serialized names appear verbatim in runtime error
/// messages, so they are part of the language's observable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Type {
    #[strum(serialize = "INTEGER")]
    Integer,
    #[strum(serialize = "BOOLEAN")]
    Boolean,
    #[strum(serialize = "NULL")]
    Null,
    #[strum(serialize = "STRING")]
    Str,
    #[strum(serialize = "ARRAY")]
    Array,
    #[strum(serialize = "HASH")]
    Hash,
    #[strum(serialize = "FUNCTION")]
    Function,
    #[strum(serialize = "BUILTIN")]
    Builtin,
    #[strum(serialize = "COMPILED_FUNCTION_OBJ")]
    CompiledFunction,
    #[strum(serialize = "CLOSUREOBJ")]
    Closure,
}

/// The closed union of runtime values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Hash(Rc<IndexMap<HashKey, HashPair>>),
    /// Evaluator-only: a function literal paired with its defining
    /// environment.
    Function(Rc<Function>),
    Builtin(Builtin),
    /// Compiler output: an instruction stream plus frame sizing.
    CompiledFunction(Rc<CompiledFunction>),
    /// VM runtime form: a compiled function plus captured free values.
    Closure(Rc<Closure>),
}

impl Value {
    #[must_use]
    pub fn type_tag(&self) -> Type {
        match self {
            Self::Integer(_) => Type::Integer,
            Self::Boolean(_) => Type::Boolean,
            Self::Null => Type::Null,
            Self::Str(_) => Type::Str,
            Self::Array(_) => Type::Array,
            Self::Hash(_) => Type::Hash,
            Self::Function(_) => Type::Function,
            Self::Builtin(_) => Type::Builtin,
            Self::CompiledFunction(_) => Type::CompiledFunction,
            Self::Closure(_) => Type::Closure,
        }
    }

    /// `false` and `null` are falsey; everything else, including `0`, empty
    /// strings and empty containers, is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Null)
    }

    /// The hash-map key form of this value, or `None` for unhashable types.
    #[must_use]
    pub fn hash_key(&self) -> Option<HashKey> {
        let key = match self {
            Self::Integer(value) => HashKey {
                kind: Type::Integer,
                value: *value as u64,
            },
            Self::Boolean(value) => HashKey {
                kind: Type::Boolean,
                value: u64::from(*value),
            },
            Self::Str(value) => HashKey {
                kind: Type::Str,
                value: fnv1a(value.as_bytes()),
            },
            _ => return None,
        };
        Some(key)
    }

    /// Renders the user-facing form of the value.
    #[must_use]
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        self.inspect_fmt(&mut out).expect("writing to String cannot fail");
        out
    }

    pub fn inspect_fmt<W: Write>(&self, f: &mut W) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
            Self::Str(value) => f.write_str(value),
            Self::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    element.inspect_fmt(f)?;
                }
                f.write_str("]")
            }
            Self::Hash(pairs) => {
                f.write_str("{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    pair.key.inspect_fmt(f)?;
                    f.write_str(": ")?;
                    pair.value.inspect_fmt(f)?;
                }
                f.write_str("}")
            }
            Self::Function(function) => {
                write!(f, "fn({}) {{\n{}\n}}", function.parameters.join(", "), function.body)
            }
            Self::Builtin(_) => f.write_str("builtin function"),
            Self::CompiledFunction(function) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(function))
            }
            Self::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
        }
    }
}

/// 64-bit FNV-1a over the raw bytes.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Key form stored in hash values. Integers hash to their value, booleans to
/// 0/1, strings to FNV-1a of their bytes; nothing else is hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: Type,
    pub value: u64,
}

/// A key/value pair as stored in a hash. The original key value is retained
/// so inspection can render it.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// Evaluator function value: parameters, body and the captured environment.
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Rc<RefCell<Environment>>,
}

/// Environments can be cyclic through self-recursive bindings, so equality
/// and debug formatting deliberately ignore the captured environment.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.parameters == other.parameters && self.body == other.body
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// Output of compiling one function literal (or the program itself).
///
/// Immutable once built; the VM reads the instruction stream and sizes its
/// frame from `num_locals`.
#[derive(Debug, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function paired with the free-variable values captured when
/// its `MakeClosure` instruction executed.
#[derive(Debug, PartialEq)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}
