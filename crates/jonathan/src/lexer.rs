//! Hand-written lexer turning source text into a token stream.
//!
//! The lexer is a byte cursor over the input with one character of
//! lookahead (enough for the two-character operators `==` and `!=`).
//! After the input is exhausted it yields `Eof` tokens forever.

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a [u8],
    /// Index of the byte in `ch`.
    position: usize,
    /// Index of the next byte to read.
    read_position: usize,
    /// Current byte under examination, `0` once the input is exhausted.
    ch: u8,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input: input.as_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
        };
        lexer.read_char();
        lexer
    }

    /// Lexes and returns the next token, advancing the cursor past it.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let token = match self.ch {
            b'=' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::new(TokenKind::Eq, "==")
                } else {
                    Token::new(TokenKind::Assign, "=")
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    Token::new(TokenKind::NotEq, "!=")
                } else {
                    Token::new(TokenKind::Bang, "!")
                }
            }
            b'+' => Token::new(TokenKind::Plus, "+"),
            b'-' => Token::new(TokenKind::Minus, "-"),
            b'*' => Token::new(TokenKind::Asterisk, "*"),
            b'/' => Token::new(TokenKind::Slash, "/"),
            b'<' => Token::new(TokenKind::Lt, "<"),
            b'>' => Token::new(TokenKind::Gt, ">"),
            b',' => Token::new(TokenKind::Comma, ","),
            b';' => Token::new(TokenKind::Semicolon, ";"),
            b':' => Token::new(TokenKind::Colon, ":"),
            b'(' => Token::new(TokenKind::LParen, "("),
            b')' => Token::new(TokenKind::RParen, ")"),
            b'{' => Token::new(TokenKind::LBrace, "{"),
            b'}' => Token::new(TokenKind::RBrace, "}"),
            b'[' => Token::new(TokenKind::LBracket, "["),
            b']' => Token::new(TokenKind::RBracket, "]"),
            b'"' => Token::new(TokenKind::Str, self.read_string()),
            0 => Token::eof(),
            c if c.is_ascii_alphabetic() || c == b'_' => {
                // read_identifier advances past the lexeme, so return early
                // to skip the trailing read_char below.
                let literal = self.read_identifier();
                return Token::new(TokenKind::lookup_ident(literal), literal);
            }
            c if c.is_ascii_digit() => {
                return Token::new(TokenKind::Int, self.read_number());
            }
            c => Token::new(TokenKind::Illegal, (c as char).to_string()),
        };

        self.read_char();
        token
    }

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied().unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        self.input.get(self.read_position).copied().unwrap_or(0)
    }

    fn skip_whitespace(&mut self) {
        while self.ch.is_ascii_whitespace() {
            self.read_char();
        }
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.position;
        while self.ch.is_ascii_alphanumeric() || self.ch == b'_' {
            self.read_char();
        }
        self.slice(start, self.position)
    }

    fn read_number(&mut self) -> &'a str {
        let start = self.position;
        while self.ch.is_ascii_digit() {
            self.read_char();
        }
        self.slice(start, self.position)
    }

    /// Reads a string literal body. The opening `"` is the current byte; the
    /// cursor is left on the closing `"` (or EOF for an unterminated literal).
    fn read_string(&mut self) -> &'a str {
        let start = self.position + 1;
        loop {
            self.read_char();
            if self.ch == b'"' || self.ch == 0 {
                break;
            }
        }
        self.slice(start, self.position)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        // The lexer only breaks the input at ASCII bytes, so slicing at these
        // positions cannot split a UTF-8 sequence.
        std::str::from_utf8(&self.input[start..end]).expect("lexer sliced inside a UTF-8 sequence")
    }
}

/// Yields tokens up to and including the final `Eof`.
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.position > self.input.len() {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            // Mark the stream as finished for subsequent calls.
            self.position = self.input.len() + 1;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_next_token_symbols() {
        let input = "=+(){},;[]:";
        let expected = [
            (TokenKind::Assign, "="),
            (TokenKind::Plus, "+"),
            (TokenKind::LParen, "("),
            (TokenKind::RParen, ")"),
            (TokenKind::LBrace, "{"),
            (TokenKind::RBrace, "}"),
            (TokenKind::Comma, ","),
            (TokenKind::Semicolon, ";"),
            (TokenKind::LBracket, "["),
            (TokenKind::RBracket, "]"),
            (TokenKind::Colon, ":"),
            (TokenKind::Eof, ""),
        ];

        let mut lexer = Lexer::new(input);
        for (kind, literal) in expected {
            let token = lexer.next_token();
            assert_eq!(token.kind, kind);
            assert_eq!(token.literal, literal);
        }
    }

    #[test]
    fn test_next_token_program() {
        let input = r#"let five = 5;
let ten = 10;

let add = fn(x, y) {
  x + y;
};

let result = add(five, ten);
!-/*5;
5 < 10 > 5;

if (5 < 10) {
	return true;
} else {
	return false;
}

10 == 10;
10 != 9;
"foobar"
"foo bar"
"#;
        let expected = [
            (TokenKind::Let, "let"),
            (TokenKind::Ident, "five"),
            (TokenKind::Assign, "="),
            (TokenKind::Int, "5"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Let, "let"),
            (TokenKind::Ident, "ten"),
            (TokenKind::Assign, "="),
            (TokenKind::Int, "10"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Let, "let"),
            (TokenKind::Ident, "add"),
            (TokenKind::Assign, "="),
            (TokenKind::Function, "fn"),
            (TokenKind::LParen, "("),
            (TokenKind::Ident, "x"),
            (TokenKind::Comma, ","),
            (TokenKind::Ident, "y"),
            (TokenKind::RParen, ")"),
            (TokenKind::LBrace, "{"),
            (TokenKind::Ident, "x"),
            (TokenKind::Plus, "+"),
            (TokenKind::Ident, "y"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::RBrace, "}"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Let, "let"),
            (TokenKind::Ident, "result"),
            (TokenKind::Assign, "="),
            (TokenKind::Ident, "add"),
            (TokenKind::LParen, "("),
            (TokenKind::Ident, "five"),
            (TokenKind::Comma, ","),
            (TokenKind::Ident, "ten"),
            (TokenKind::RParen, ")"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Bang, "!"),
            (TokenKind::Minus, "-"),
            (TokenKind::Slash, "/"),
            (TokenKind::Asterisk, "*"),
            (TokenKind::Int, "5"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Int, "5"),
            (TokenKind::Lt, "<"),
            (TokenKind::Int, "10"),
            (TokenKind::Gt, ">"),
            (TokenKind::Int, "5"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::If, "if"),
            (TokenKind::LParen, "("),
            (TokenKind::Int, "5"),
            (TokenKind::Lt, "<"),
            (TokenKind::Int, "10"),
            (TokenKind::RParen, ")"),
            (TokenKind::LBrace, "{"),
            (TokenKind::Return, "return"),
            (TokenKind::True, "true"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::RBrace, "}"),
            (TokenKind::Else, "else"),
            (TokenKind::LBrace, "{"),
            (TokenKind::Return, "return"),
            (TokenKind::False, "false"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::RBrace, "}"),
            (TokenKind::Int, "10"),
            (TokenKind::Eq, "=="),
            (TokenKind::Int, "10"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Int, "10"),
            (TokenKind::NotEq, "!="),
            (TokenKind::Int, "9"),
            (TokenKind::Semicolon, ";"),
            (TokenKind::Str, "foobar"),
            (TokenKind::Str, "foo bar"),
            (TokenKind::Eof, ""),
        ];

        let mut lexer = Lexer::new(input);
        for (kind, literal) in expected {
            let token = lexer.next_token();
            assert_eq!((token.kind, token.literal.as_str()), (kind, literal));
        }
    }

    #[test]
    fn test_illegal_character() {
        let mut lexer = Lexer::new("let a = 5 @");
        let kinds: Vec<TokenKind> = std::iter::from_fn(|| Some(lexer.next_token().kind))
            .take(6)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Illegal,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_iterator_stops_after_eof() {
        let tokens: Vec<TokenKind> = kinds("1;");
        assert_eq!(
            tokens,
            vec![TokenKind::Int, TokenKind::Semicolon, TokenKind::Eof]
        );
    }
}
