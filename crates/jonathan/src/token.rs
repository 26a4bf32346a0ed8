//! Token stream interface between the lexer and the parser.

use strum::Display;

/// The closed set of token classes Jonathan source text decomposes into.
///
/// Uses the strum `Display` derive so diagnostics can name the class the
/// parser expected: operators and delimiters render as their source form,
/// identifier/literal classes and keywords as upper-case tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenKind {
    #[strum(serialize = "ILLEGAL")]
    Illegal,
    #[strum(serialize = "EOF")]
    Eof,

    /// Identifiers: `add`, `foobar`, `x`, `y`, ...
    #[strum(serialize = "IDENT")]
    Ident,
    /// Decimal integer literals.
    #[strum(serialize = "INT")]
    Int,
    /// Double-quoted string literals.
    #[strum(serialize = "STRING")]
    Str,

    // Operators
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "*")]
    Asterisk,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,

    // Delimiters
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ";")]
    Semicolon,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "{{")]
    LBrace,
    #[strum(serialize = "}}")]
    RBrace,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,

    // Keywords
    #[strum(serialize = "FUNCTION")]
    Function,
    #[strum(serialize = "LET")]
    Let,
    #[strum(serialize = "TRUE")]
    True,
    #[strum(serialize = "FALSE")]
    False,
    #[strum(serialize = "IF")]
    If,
    #[strum(serialize = "ELSE")]
    Else,
    #[strum(serialize = "RETURN")]
    Return,
}

impl TokenKind {
    /// Classifies an identifier-shaped lexeme as a keyword or plain identifier.
    #[must_use]
    pub fn lookup_ident(ident: &str) -> Self {
        match ident {
            "fn" => Self::Function,
            "let" => Self::Let,
            "true" => Self::True,
            "false" => Self::False,
            "if" => Self::If,
            "else" => Self::Else,
            "return" => Self::Return,
            _ => Self::Ident,
        }
    }
}

/// A single token: its class plus the literal text it was lexed from.
///
/// Tokens are ephemeral; the parser consumes the stream and nothing
/// downstream of the AST retains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }

    /// The token the parser sees before the first `next_token` call and after
    /// the input is exhausted.
    #[must_use]
    pub fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }
}
