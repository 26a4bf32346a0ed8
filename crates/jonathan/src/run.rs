//! Public interface for running Jonathan code.

use std::fmt;
use std::io::Write;

use strum::{Display, EnumString};

use crate::bytecode::{Compiler, Vm};
use crate::error::{CompileError, RuntimeError};
use crate::eval::{eval_program, Environment};
use crate::parser::Parser;
use crate::value::Value;

/// Which back end executes the program. The two are interchangeable: same
/// results, different machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Engine {
    /// Compile to bytecode and run on the stack VM.
    #[default]
    Vm,
    /// Walk the AST directly.
    Eval,
}

/// Everything that can stop a source string from producing a value.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The parser's accumulated diagnostics; parsing never aborts early, so
    /// there can be several.
    Parse(Vec<String>),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(errors) => write!(f, "{}", errors.join("\n")),
            Self::Compile(error) => write!(f, "{error}"),
            Self::Runtime(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Parses and runs `source` under the chosen engine, returning the value of
/// its last statement. `output` receives anything `puts` prints.
pub fn run_source<W: Write>(
    source: &str,
    engine: Engine,
    output: &mut W,
) -> Result<Value, EngineError> {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        return Err(EngineError::Parse(parser.errors().to_vec()));
    }

    match engine {
        Engine::Vm => {
            let bytecode = Compiler::new()
                .compile(&program)
                .map_err(EngineError::Compile)?;
            let mut vm = Vm::new(bytecode, output);
            vm.run().map_err(EngineError::Runtime)?;
            Ok(vm.last_popped().clone())
        }
        Engine::Eval => {
            eval_program(&program, &Environment::new(), output).map_err(EngineError::Runtime)
        }
    }
}
