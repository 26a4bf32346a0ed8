//! Recursive AST evaluation against a lexical environment.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;

use super::environment::Environment;
use crate::ast::{BlockStatement, Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::builtins::Builtin;
use crate::error::{runtime_err, RunResult, RuntimeError};
use crate::value::{Function, HashPair, Value};

/// How a subtree finished: with a plain value, or with a `return` that is
/// still unwinding to the nearest function-call boundary.
enum Flow {
    Value(Value),
    Return(Value),
}

/// Unwraps a `Flow`, propagating an unwinding `return` out of the enclosing
/// eval function.
macro_rules! flow_value {
    ($flow:expr) => {
        match $flow? {
            Flow::Return(value) => return Ok(Flow::Return(value)),
            Flow::Value(value) => value,
        }
    };
}

/// Evaluates a program, producing the value of its last statement.
pub fn eval_program<W: Write>(
    program: &Program,
    env: &Rc<RefCell<Environment>>,
    output: &mut W,
) -> RunResult<Value> {
    let mut result = Value::Null;
    for statement in &program.statements {
        match eval_statement(statement, env, output)? {
            // A top-level `return` ends the program with that value.
            Flow::Return(value) => return Ok(value),
            Flow::Value(value) => result = value,
        }
    }
    Ok(result)
}

fn eval_statement<W: Write>(
    statement: &Statement,
    env: &Rc<RefCell<Environment>>,
    output: &mut W,
) -> RunResult<Flow> {
    match statement {
        Statement::Expr { expr } => eval_expression(expr, env, output),
        Statement::Return { value } => {
            let value = flow_value!(eval_expression(value, env, output));
            Ok(Flow::Return(value))
        }
        Statement::Let { name, value } => {
            let value = flow_value!(eval_expression(value, env, output));
            env.borrow_mut().set(name.clone(), value);
            Ok(Flow::Value(Value::Null))
        }
    }
}

fn eval_block<W: Write>(
    block: &BlockStatement,
    env: &Rc<RefCell<Environment>>,
    output: &mut W,
) -> RunResult<Flow> {
    let mut result = Value::Null;
    for statement in &block.statements {
        match eval_statement(statement, env, output)? {
            // Keep unwinding; only a function call boundary stops a return.
            Flow::Return(value) => return Ok(Flow::Return(value)),
            Flow::Value(value) => result = value,
        }
    }
    Ok(Flow::Value(result))
}

fn eval_expression<W: Write>(
    expression: &Expression,
    env: &Rc<RefCell<Environment>>,
    output: &mut W,
) -> RunResult<Flow> {
    let value = match expression {
        Expression::IntegerLiteral(value) => Value::Integer(*value),
        Expression::StringLiteral(value) => Value::Str(Rc::from(value.as_str())),
        Expression::Boolean(value) => Value::Boolean(*value),
        Expression::Identifier(name) => eval_identifier(name, env)?,
        Expression::Prefix { operator, right } => {
            let right = flow_value!(eval_expression(right, env, output));
            eval_prefix(*operator, &right)?
        }
        Expression::Infix {
            left,
            operator,
            right,
        } => {
            let left = flow_value!(eval_expression(left, env, output));
            let right = flow_value!(eval_expression(right, env, output));
            eval_infix(*operator, &left, &right)?
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = flow_value!(eval_expression(condition, env, output));
            if condition.is_truthy() {
                flow_value!(eval_block(consequence, env, output))
            } else if let Some(alternative) = alternative {
                flow_value!(eval_block(alternative, env, output))
            } else {
                Value::Null
            }
        }
        Expression::FunctionLiteral {
            parameters, body, ..
        } => Value::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: Rc::clone(env),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = flow_value!(eval_expression(function, env, output));
            let mut args = Vec::with_capacity(arguments.len());
            for argument in arguments {
                args.push(flow_value!(eval_expression(argument, env, output)));
            }
            apply_function(&function, &args, output)?
        }
        Expression::ArrayLiteral(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(flow_value!(eval_expression(element, env, output)));
            }
            Value::Array(Rc::new(values))
        }
        Expression::Index { left, index } => {
            let left = flow_value!(eval_expression(left, env, output));
            let index = flow_value!(eval_expression(index, env, output));
            eval_index(&left, &index)?
        }
        Expression::HashLiteral(pairs) => {
            let mut map = IndexMap::with_capacity(pairs.len());
            for (key_expr, value_expr) in pairs {
                let key = flow_value!(eval_expression(key_expr, env, output));
                let value = flow_value!(eval_expression(value_expr, env, output));
                let Some(hash_key) = key.hash_key() else {
                    return runtime_err!("unusable as hash key: {}", key.type_tag());
                };
                // Duplicate keys keep the last occurrence.
                map.insert(hash_key, HashPair { key, value });
            }
            Value::Hash(Rc::new(map))
        }
    };
    Ok(Flow::Value(value))
}

fn eval_identifier(name: &str, env: &Rc<RefCell<Environment>>) -> RunResult<Value> {
    if let Some(value) = env.borrow().get(name) {
        return Ok(value);
    }
    if let Ok(builtin) = Builtin::from_str(name) {
        return Ok(Value::Builtin(builtin));
    }
    runtime_err!("identifier not found: {name}")
}

fn eval_prefix(operator: PrefixOperator, right: &Value) -> RunResult<Value> {
    match operator {
        PrefixOperator::Bang => Ok(Value::Boolean(!right.is_truthy())),
        PrefixOperator::Minus => match right {
            Value::Integer(value) => Ok(Value::Integer(value.wrapping_neg())),
            other => runtime_err!("unsupported type for negation: {}", other.type_tag()),
        },
    }
}

fn eval_infix(operator: InfixOperator, left: &Value, right: &Value) -> RunResult<Value> {
    match (left, right) {
        (Value::Integer(left), Value::Integer(right)) => {
            eval_integer_infix(operator, *left, *right)
        }
        (Value::Str(left), Value::Str(right)) if operator == InfixOperator::Add => {
            let mut concatenated = String::with_capacity(left.len() + right.len());
            concatenated.push_str(left);
            concatenated.push_str(right);
            Ok(Value::Str(Rc::from(concatenated)))
        }
        // Equality is defined between values of the same runtime type;
        // anything else is an operator error.
        _ if left.type_tag() == right.type_tag()
            && matches!(operator, InfixOperator::Eq | InfixOperator::NotEq) =>
        {
            let equal = left == right;
            Ok(Value::Boolean(if operator == InfixOperator::Eq {
                equal
            } else {
                !equal
            }))
        }
        _ if left.type_tag() == right.type_tag() => runtime_err!(
            "unknown operator: {} ({} {})",
            operator,
            left.type_tag(),
            right.type_tag()
        ),
        _ => runtime_err!(
            "unsupported types for binary operation: {} {}",
            left.type_tag(),
            right.type_tag()
        ),
    }
}

fn eval_integer_infix(operator: InfixOperator, left: i64, right: i64) -> RunResult<Value> {
    let value = match operator {
        InfixOperator::Add => Value::Integer(left.wrapping_add(right)),
        InfixOperator::Sub => Value::Integer(left.wrapping_sub(right)),
        InfixOperator::Mul => Value::Integer(left.wrapping_mul(right)),
        InfixOperator::Div => {
            if right == 0 {
                return runtime_err!("division by zero");
            }
            Value::Integer(left.wrapping_div(right))
        }
        InfixOperator::Eq => Value::Boolean(left == right),
        InfixOperator::NotEq => Value::Boolean(left != right),
        InfixOperator::Lt => Value::Boolean(left < right),
        InfixOperator::Gt => Value::Boolean(left > right),
    };
    Ok(value)
}

fn eval_index(left: &Value, index: &Value) -> RunResult<Value> {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let value = usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i).cloned())
                .unwrap_or(Value::Null);
            Ok(value)
        }
        (Value::Hash(pairs), key) => {
            let Some(hash_key) = key.hash_key() else {
                return runtime_err!("unusable as hash key: {}", key.type_tag());
            };
            Ok(pairs
                .get(&hash_key)
                .map_or(Value::Null, |pair| pair.value.clone()))
        }
        _ => runtime_err!("index operator not supported: {}", left.type_tag()),
    }
}

fn apply_function<W: Write>(function: &Value, args: &[Value], output: &mut W) -> RunResult<Value> {
    match function {
        Value::Function(function) => {
            if args.len() != function.parameters.len() {
                return runtime_err!(
                    "wrong number of arguments: want={}, got={}",
                    function.parameters.len(),
                    args.len()
                );
            }
            let call_env = Environment::enclosed(Rc::clone(&function.env));
            for (parameter, value) in function.parameters.iter().zip(args) {
                call_env.borrow_mut().set(parameter.clone(), value.clone());
            }
            // The call boundary absorbs a `return` from the body.
            match eval_block(&function.body, &call_env, output)? {
                Flow::Return(value) | Flow::Value(value) => Ok(value),
            }
        }
        Value::Builtin(builtin) => builtin.call(args, output),
        other => runtime_err!("not a function: {}", other.type_tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn eval(input: &str) -> RunResult<Value> {
        let mut parser = Parser::from_source(input);
        let program = parser.parse_program();
        assert_eq!(parser.errors(), &[] as &[String], "input: {input}");
        eval_program(&program, &Environment::new(), &mut Vec::new())
    }

    #[track_caller]
    fn expect_int(input: &str, expected: i64) {
        assert_eq!(eval(input), Ok(Value::Integer(expected)), "input: {input}");
    }

    #[track_caller]
    fn expect_bool(input: &str, expected: bool) {
        assert_eq!(eval(input), Ok(Value::Boolean(expected)), "input: {input}");
    }

    #[track_caller]
    fn expect_error(input: &str, message: &str) {
        assert_eq!(eval(input), Err(RuntimeError::new(message)), "input: {input}");
    }

    #[test]
    fn test_integer_expressions() {
        expect_int("5", 5);
        expect_int("-10", -10);
        expect_int("5 + 5 + 5 + 5 - 10", 10);
        expect_int("2 * 2 * 2 * 2 * 2", 32);
        expect_int("50 / 2 * 2 + 10", 60);
        expect_int("3 * (3 * 3) + 10", 37);
    }

    #[test]
    fn test_boolean_expressions() {
        expect_bool("true", true);
        expect_bool("1 < 2", true);
        expect_bool("1 > 2", false);
        expect_bool("1 == 1", true);
        expect_bool("1 != 2", true);
        expect_bool("true != false", true);
        expect_bool("(1 < 2) == true", true);
        expect_bool("!true", false);
        expect_bool("!!5", true);
    }

    #[test]
    fn test_if_expressions() {
        expect_int("if (true) { 10 }", 10);
        expect_int("if (1) { 10 }", 10);
        expect_int("if (1 < 2) { 10 } else { 20 }", 10);
        expect_int("if (1 > 2) { 10 } else { 20 }", 20);
        assert_eq!(eval("if (false) { 10 }"), Ok(Value::Null));
    }

    #[test]
    fn test_return_statements() {
        expect_int("return 10;", 10);
        expect_int("return 10; 9;", 10);
        expect_int("return 2 * 5; 9;", 10);
        expect_int("9; return 2 * 5; 9;", 10);
        // The return unwinds through the nested block, not just the inner if.
        expect_int(
            "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
            10,
        );
    }

    #[test]
    fn test_let_statements() {
        expect_int("let a = 5; a;", 5);
        expect_int("let a = 5 * 5; a;", 25);
        expect_int("let a = 5; let b = a; b;", 5);
        expect_int("let a = 5; let b = a; let c = a + b + 5; c;", 15);
    }

    #[test]
    fn test_functions_and_calls() {
        expect_int("let identity = fn(x) { x; }; identity(5);", 5);
        expect_int("let identity = fn(x) { return x; }; identity(5);", 5);
        expect_int("let double = fn(x) { x * 2; }; double(5);", 10);
        expect_int("let add = fn(x, y) { x + y; }; add(5, 5);", 10);
        expect_int("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20);
        expect_int("fn(x) { x; }(5)", 5);
    }

    #[test]
    fn test_closures() {
        expect_int(
            "let newAdder = fn(x) { fn(y) { x + y }; }; let addTwo = newAdder(2); addTwo(2);",
            4,
        );
        expect_int(
            "let c = fn(x) { fn(y) { fn(z) { x + y + z } } }; c(1)(2)(3)",
            6,
        );
    }

    #[test]
    fn test_recursion() {
        expect_int(
            "let counter = fn(x) { if (x > 100) { return x; } else { counter(x + 1); } }; counter(0)",
            101,
        );
        expect_int(
            "let fib = fn(x) { if (x < 2) { x } else { fib(x - 1) + fib(x - 2) } }; fib(10)",
            55,
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            eval(r#""Hello" + " " + "World!""#),
            Ok(Value::Str(Rc::from("Hello World!")))
        );
        expect_bool(r#""a" == "a""#, true);
        expect_error(r#""a" - "b""#, "unknown operator: - (STRING STRING)");
    }

    #[test]
    fn test_arrays_and_indexing() {
        expect_int("[1, 2 * 2, 3 + 3][2]", 6);
        expect_int("let a = [1, 2, 3]; a[0] + a[1] + a[2]", 6);
        assert_eq!(eval("[1, 2, 3][3]"), Ok(Value::Null));
        assert_eq!(eval("[1, 2, 3][-1]"), Ok(Value::Null));
    }

    #[test]
    fn test_hashes() {
        expect_int(
            r#"let two = "two";
               {"one": 10 - 9, two: 1 + 1, "thr" + "ee": 6 / 2, 4: 4, true: 5, false: 6}["three"]"#,
            3,
        );
        assert_eq!(eval(r#"{"foo": 5}["bar"]"#), Ok(Value::Null));
        expect_int("{1: 1, 1: 2}[1]", 2);
        expect_error(
            r#"{"name": "Jonathan"}[fn(x) { x }]"#,
            "unusable as hash key: FUNCTION",
        );
    }

    #[test]
    fn test_builtins() {
        expect_int(r#"len("four")"#, 4);
        expect_int("len([1, 2, 3])", 3);
        expect_error("len(1)", "argument to `len` not supported, got INTEGER");
    }

    #[test]
    fn test_error_handling() {
        expect_error("5 + true;", "unsupported types for binary operation: INTEGER BOOLEAN");
        expect_error("5 + true; 5;", "unsupported types for binary operation: INTEGER BOOLEAN");
        expect_error("-true", "unsupported type for negation: BOOLEAN");
        expect_error("true + false;", "unknown operator: + (BOOLEAN BOOLEAN)");
        expect_error("foobar", "identifier not found: foobar");
        expect_error("5(1)", "not a function: INTEGER");
        expect_error("fn(a) { a; }(1, 2)", "wrong number of arguments: want=1, got=2");
        expect_error("5 / 0", "division by zero");
    }

    #[test]
    fn test_puts_writes_to_sink() {
        let program = Parser::from_source(r#"puts("eval")"#).parse_program();
        let mut output = Vec::new();
        let result = eval_program(&program, &Environment::new(), &mut output).unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(String::from_utf8(output).unwrap(), "eval\n");
    }
}
