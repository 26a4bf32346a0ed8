//! AST node definitions and the canonical re-printer.
//!
//! Statements and expressions are closed tagged unions; every consumer
//! dispatches by pattern match. `Display` renders each node back to
//! canonical source text, which is what the REPL echoes for definitions and
//! what the parser tests round-trip through.

use std::fmt;

use strum::Display;

/// A parsed program: an ordered sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let <name> = <value>;`
    Let { name: String, value: Expression },
    /// `return <value>;`
    Return { value: Expression },
    /// A bare expression used as a statement.
    Expr { expr: Expression },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Let { name, value } => write!(f, "let {name} = {value};"),
            Self::Return { value } => write!(f, "return {value};"),
            Self::Expr { expr } => write!(f, "{expr}"),
        }
    }
}

/// A brace-delimited statement sequence, the body form used by `if` and
/// function literals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(String),
    IntegerLiteral(i64),
    StringLiteral(String),
    Boolean(bool),
    Prefix {
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    /// `fn(params) { body }`. The `name` field is filled in by the parser
    /// when the literal is the right-hand side of a `let`, which is what
    /// lets the compiler resolve self-recursive calls.
    FunctionLiteral {
        parameters: Vec<String>,
        body: BlockStatement,
        name: Option<String>,
    },
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    ArrayLiteral(Vec<Expression>),
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
    /// Hash literal pairs in source order. Duplicate keys keep the last
    /// occurrence once the literal is materialized into a hash map.
    HashLiteral(Vec<(Expression, Expression)>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(name) => write!(f, "{name}"),
            Self::IntegerLiteral(value) => write!(f, "{value}"),
            Self::StringLiteral(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Prefix { operator, right } => write!(f, "({operator}{right})"),
            Self::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Self::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if {condition} {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {alternative}")?;
                }
                Ok(())
            }
            Self::FunctionLiteral {
                parameters,
                body,
                name,
            } => {
                write!(f, "fn")?;
                if let Some(name) = name {
                    write!(f, "<{name}>")?;
                }
                write!(f, "({}) {body}", parameters.join(", "))
            }
            Self::Call {
                function,
                arguments,
            } => {
                let args: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                write!(f, "{function}({})", args.join(", "))
            }
            Self::ArrayLiteral(elements) => {
                let elements: Vec<String> = elements.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Self::Index { left, index } => write!(f, "({left}[{index}])"),
            Self::HashLiteral(pairs) => {
                let pairs: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

/// Unary operators, binding at `Precedence::Prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PrefixOperator {
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "-")]
    Minus,
}

/// Binary operators. `<` has no opcode of its own; the compiler swaps the
/// operands and emits the greater-than comparison instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InfixOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_display() {
        let program = Program {
            statements: vec![Statement::Let {
                name: "myVar".to_owned(),
                value: Expression::Identifier("anotherVar".to_owned()),
            }],
        };
        assert_eq!(program.to_string(), "let myVar = anotherVar;");
    }

    #[test]
    fn test_named_function_literal_display() {
        let literal = Expression::FunctionLiteral {
            parameters: vec!["x".to_owned()],
            body: BlockStatement {
                statements: vec![Statement::Expr {
                    expr: Expression::Identifier("x".to_owned()),
                }],
            },
            name: Some("identity".to_owned()),
        };
        assert_eq!(literal.to_string(), "fn<identity>(x) x");
    }
}
