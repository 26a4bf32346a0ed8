//! Tests for stateful REPL execution.
//!
//! The session keeps the symbol table, constants and globals between inputs
//! and executes only the newly fed line each time.

use jonathan::{run_repl, EngineError, ReplSession, Value};
use pretty_assertions::assert_eq;

fn feed(session: &mut ReplSession, line: &str) -> Result<Value, EngineError> {
    session.eval_line(line, &mut Vec::new())
}

#[test]
fn repl_threads_definitions_across_inputs() {
    let mut session = ReplSession::new();
    feed(&mut session, "let five = 5;").unwrap();
    feed(&mut session, "let ten = five * 2;").unwrap();
    feed(&mut session, "let add = fn(a, b) { a + b };").unwrap();
    assert_eq!(feed(&mut session, "add(five, ten)"), Ok(Value::Integer(15)));
}

#[test]
fn repl_closures_capture_across_inputs() {
    let mut session = ReplSession::new();
    feed(&mut session, "let newAdder = fn(x) { fn(y) { x + y } };").unwrap();
    feed(&mut session, "let addTwo = newAdder(2);").unwrap();
    assert_eq!(feed(&mut session, "addTwo(40)"), Ok(Value::Integer(42)));
}

#[test]
fn repl_rebinding_uses_latest_definition() {
    let mut session = ReplSession::new();
    feed(&mut session, "let f = fn() { 1 };").unwrap();
    assert_eq!(feed(&mut session, "f()"), Ok(Value::Integer(1)));
    feed(&mut session, "let f = fn() { 2 };").unwrap();
    assert_eq!(feed(&mut session, "f()"), Ok(Value::Integer(2)));
}

#[test]
fn repl_errors_leave_prior_state_intact() {
    let mut session = ReplSession::new();
    feed(&mut session, "let answer = 42;").unwrap();

    assert!(matches!(
        feed(&mut session, "let x = ;"),
        Err(EngineError::Parse(_))
    ));
    assert!(matches!(
        feed(&mut session, "nonexistent"),
        Err(EngineError::Compile(_))
    ));
    assert!(matches!(
        feed(&mut session, "answer + true"),
        Err(EngineError::Runtime(_))
    ));

    assert_eq!(feed(&mut session, "answer"), Ok(Value::Integer(42)));
}

#[test]
fn repl_builtins_are_always_in_scope() {
    let mut session = ReplSession::new();
    assert_eq!(
        feed(&mut session, "len(push([1], 2))"),
        Ok(Value::Integer(2))
    );
}

#[test]
fn repl_session_output_format() {
    let input = "let a = 2;\na + 3\nbad syntax ![\n";
    let mut output = Vec::new();
    run_repl(input.as_bytes(), &mut output).unwrap();
    let output = String::from_utf8(output).unwrap();

    // Prompt before each line, result inspect after each evaluation, parser
    // errors in the indented block format.
    assert!(output.starts_with(">>2\n>>5\n>> parser errors:\n\t"), "got: {output:?}");
    assert!(output.ends_with(">>"), "got: {output:?}");
}
