//! Tree-walking evaluator: the reference semantics for the language.
//!
//! Structurally simpler and slower than the bytecode back end; the two are
//! interchangeable and the integration tests hold them to the same results.

mod environment;
mod evaluator;

pub use environment::Environment;
pub use evaluator::eval_program;
