//! Stateful REPL execution.
//!
//! Each input line is compiled and run against persistent state: the symbol
//! table, the constants pool and the globals array all survive between
//! lines, so a `let` binding from one input resolves in the next without
//! replaying anything.

use std::io::{BufRead, Write};
use std::mem;

use crate::bytecode::{Compiler, Vm, GLOBALS_SIZE};
use crate::parser::Parser;
use crate::run::EngineError;
use crate::symbol_table::SymbolTable;
use crate::value::Value;

const PROMPT: &str = ">>";

/// Compile-and-run state threaded across REPL inputs.
pub struct ReplSession {
    symbols: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        // A fresh compiler carries the builtin-seeded symbol table.
        let (symbols, constants) = Compiler::new().into_state();
        Self {
            symbols,
            constants,
            globals: vec![Value::Null; GLOBALS_SIZE],
        }
    }

    /// Parses, compiles and runs one input line, returning the value the
    /// final `Pop` removed. State survives errors, so a bad line does not
    /// poison the session.
    pub fn eval_line<W: Write>(&mut self, line: &str, output: &mut W) -> Result<Value, EngineError> {
        let mut parser = Parser::from_source(line);
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            return Err(EngineError::Parse(parser.errors().to_vec()));
        }

        let mut compiler =
            Compiler::with_state(mem::take(&mut self.symbols), mem::take(&mut self.constants));
        let compiled = compiler.compile(&program);
        // Hand the state back before inspecting the result so a compile
        // error leaves the session usable.
        (self.symbols, self.constants) = compiler.into_state();
        let bytecode = compiled.map_err(EngineError::Compile)?;

        let mut vm = Vm::with_globals(bytecode, mem::take(&mut self.globals), output);
        let outcome = vm.run();
        let last_popped = vm.last_popped().clone();
        self.globals = vm.into_globals();
        outcome.map_err(EngineError::Runtime)?;
        Ok(last_popped)
    }
}

/// Reads lines from `input`, evaluates each, and writes results and errors
/// to `output` until the input ends.
pub fn run_repl<R: BufRead, W: Write>(input: R, output: &mut W) -> std::io::Result<()> {
    let mut session = ReplSession::new();

    write!(output, "{PROMPT}")?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        match session.eval_line(&line, output) {
            Ok(value) => writeln!(output, "{}", value.inspect())?,
            Err(EngineError::Parse(errors)) => {
                writeln!(output, " parser errors:")?;
                for message in errors {
                    writeln!(output, "\t{message}")?;
                }
            }
            Err(EngineError::Compile(error)) => {
                writeln!(output, "Woops! Compilation failed:\n {error}")?;
            }
            Err(EngineError::Runtime(error)) => {
                writeln!(output, "Woops! Executing bytecode failed:\n {error}")?;
            }
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(session: &mut ReplSession, line: &str) -> Result<Value, EngineError> {
        session.eval_line(line, &mut Vec::new())
    }

    #[test]
    fn test_bindings_survive_between_lines() {
        let mut session = ReplSession::new();
        feed(&mut session, "let a = 5;").unwrap();
        assert_eq!(feed(&mut session, "a + 2"), Ok(Value::Integer(7)));
    }

    #[test]
    fn test_functions_survive_between_lines() {
        let mut session = ReplSession::new();
        feed(&mut session, "let double = fn(x) { x * 2 };").unwrap();
        assert_eq!(feed(&mut session, "double(21)"), Ok(Value::Integer(42)));
    }

    #[test]
    fn test_errors_do_not_poison_the_session() {
        let mut session = ReplSession::new();
        feed(&mut session, "let a = 5;").unwrap();

        assert!(matches!(
            feed(&mut session, "let x 5;"),
            Err(EngineError::Parse(_))
        ));
        assert!(matches!(
            feed(&mut session, "missing"),
            Err(EngineError::Compile(_))
        ));
        assert!(matches!(
            feed(&mut session, "5 + true"),
            Err(EngineError::Runtime(_))
        ));

        assert_eq!(feed(&mut session, "a"), Ok(Value::Integer(5)));
    }

    #[test]
    fn test_run_repl_formats_output() {
        let input = "1 + 2\nlet x 5;\nmissing\n";
        let mut output = Vec::new();
        run_repl(input.as_bytes(), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            ">>3\n\
             >> parser errors:\n\
             \texpected =, got INT\n\
             >>Woops! Compilation failed:\n \
             undefined variable missing\n\
             >>"
        );
    }

    #[test]
    fn test_run_repl_runtime_error_format() {
        let mut output = Vec::new();
        run_repl("-true\n".as_bytes(), &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(
            output,
            ">>Woops! Executing bytecode failed:\n \
             unsupported type for negation: BOOLEAN\n\
             >>"
        );
    }

    #[test]
    fn test_puts_interleaves_with_results() {
        let mut session = ReplSession::new();
        let mut output = Vec::new();
        let result = session.eval_line(r#"puts("hi"); 7"#, &mut output).unwrap();
        assert_eq!(result, Value::Integer(7));
        assert_eq!(String::from_utf8(output).unwrap(), "hi\n");
    }
}
