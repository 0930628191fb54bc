//! Lexer for workload scripts.
//!
//! Turns a source string into a flat token stream. Whitespace separates
//! tokens and never appears inside one. The first lexical error aborts the
//! scan; recovery happens at the driver level by rejecting the script.

use std::fmt;

use crate::token::{Span, Token, TokenKind};

/// A lexical error, carrying the byte offset it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character that starts no token (e.g. `;`, `@`).
    UnexpectedCharacter { character: char, at: usize },
    /// A lone `:`; only `::` is a token.
    ExpectedDoubleColon { at: usize },
    /// A lone `.`; only `..` is a token.
    ExpectedDoubleDot { at: usize },
    /// A string literal with no closing quote before end of input.
    UnterminatedString { started_at: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedCharacter { character, at } => {
                write!(f, "unexpected character `{character}` at byte {at}")
            }
            LexError::ExpectedDoubleColon { at } => {
                write!(f, "expected `::` at byte {at}, found a lone `:`")
            }
            LexError::ExpectedDoubleDot { at } => {
                write!(f, "expected `..` at byte {at}, found a lone `.`")
            }
            LexError::UnterminatedString { started_at } => {
                write!(f, "unterminated string literal starting at byte {started_at}")
            }
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'src> {
    source: &'src str,
    cursor: usize,
}

impl<'src> Lexer<'src> {
    /// Lex the whole source, or fail on the first malformed token.
    pub fn lex(source: &'src str) -> Result<Vec<Token<'src>>, LexError> {
        let mut lexer = Lexer { source, cursor: 0 };
        let mut tokens = Vec::new();

        lexer.skip_whitespace();
        while lexer.has_more() {
            tokens.push(lexer.next_token()?);
            lexer.skip_whitespace();
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token<'src>, LexError> {
        let byte = self.source.as_bytes()[self.cursor];

        if byte.is_ascii_digit() {
            return Ok(self.number());
        }

        match byte {
            b'(' => Ok(self.single_character(TokenKind::LeftParen)),
            b')' => Ok(self.single_character(TokenKind::RightParen)),
            b'[' => Ok(self.single_character(TokenKind::LeftBracket)),
            b']' => Ok(self.single_character(TokenKind::RightBracket)),
            b'{' => Ok(self.single_character(TokenKind::LeftCurly)),
            b'}' => Ok(self.single_character(TokenKind::RightCurly)),
            b',' => Ok(self.single_character(TokenKind::Comma)),
            b':' => self.colon_colon(),
            b'.' => self.dot_dot(),
            b'"' => self.string_literal(),
            _ if byte.is_ascii_alphanumeric() => Ok(self.keyword_or_identifier()),
            _ => {
                // Report the full (possibly multi-byte) character, not the byte.
                let character = self.source[self.cursor..]
                    .chars()
                    .next()
                    .expect("cursor is on a character boundary");
                Err(LexError::UnexpectedCharacter {
                    character,
                    at: self.cursor,
                })
            }
        }
    }

    fn single_character(&mut self, kind: TokenKind) -> Token<'src> {
        let start = self.cursor;
        self.cursor += 1;
        self.token(kind, start, self.cursor)
    }

    fn number(&mut self) -> Token<'src> {
        let start = self.cursor;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.cursor += 1;
        }
        self.token(TokenKind::Number, start, self.cursor)
    }

    fn keyword_or_identifier(&mut self) -> Token<'src> {
        let start = self.cursor;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.cursor += 1;
        }

        let lexeme = &self.source[start..self.cursor];
        let kind = if Token::is_keyword(lexeme) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.token(kind, start, self.cursor)
    }

    fn string_literal(&mut self) -> Result<Token<'src>, LexError> {
        let opening = self.cursor;
        self.cursor += 1;

        let start = self.cursor;
        loop {
            match self.peek() {
                Some(b'"') => {
                    let end = self.cursor;
                    self.cursor += 1;
                    return Ok(self.token(TokenKind::StringLiteral, start, end));
                }
                Some(_) => self.cursor += 1,
                None => return Err(LexError::UnterminatedString { started_at: opening }),
            }
        }
    }

    fn colon_colon(&mut self) -> Result<Token<'src>, LexError> {
        let start = self.cursor;
        self.cursor += 1;
        if self.peek() == Some(b':') {
            self.cursor += 1;
            Ok(self.token(TokenKind::ColonColon, start, self.cursor))
        } else {
            Err(LexError::ExpectedDoubleColon { at: start })
        }
    }

    fn dot_dot(&mut self) -> Result<Token<'src>, LexError> {
        let start = self.cursor;
        self.cursor += 1;
        if self.peek() == Some(b'.') {
            self.cursor += 1;
            Ok(self.token(TokenKind::DotDot, start, self.cursor))
        } else {
            Err(LexError::ExpectedDoubleDot { at: start })
        }
    }

    fn token(&self, kind: TokenKind, start: usize, end: usize) -> Token<'src> {
        Token {
            lexeme: &self.source[start..end],
            kind,
            span: Span::new(start, end),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.cursor).copied()
    }

    fn has_more(&self) -> bool {
        self.cursor < self.source.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.cursor += 1;
        }
    }
}
