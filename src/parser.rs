//! Recursive-descent parser for workload scripts.
//!
//! Consumes a token stream and builds the arena [`Ast`]. One token of
//! lookahead disambiguates calls (`name(`), constants (`name ::`) and bare
//! variables. The parser does not attempt recovery: the first mismatch or
//! premature end of input fails the whole script.

use std::fmt;

use crate::ast::{Ast, Expression, ExpressionId, ExpressionKind};
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Ran out of tokens in the middle of a production.
    UnexpectedEof { expected: &'static str },
    /// The next token did not match the production.
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
        span: Span,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEof { expected } => {
                write!(f, "expected {expected} but ran out of tokens")
            }
            ParseError::UnexpectedToken {
                expected,
                found,
                span,
            } => {
                write!(f, "expected {expected} but got {found} at {span}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

pub struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    cursor: usize,
    ast: Ast<'src>,
}

impl<'src> Parser<'src> {
    /// Parse a full token stream into an [`Ast`].
    pub fn parse(tokens: Vec<Token<'src>>) -> Result<Ast<'src>, ParseError> {
        let mut parser = Parser {
            tokens,
            cursor: 0,
            ast: Ast::default(),
        };

        while parser.has_more() {
            let expression = parser.expression()?;
            let (id, span) = (expression.id, expression.span);
            parser.ast.emplace_statement(id, span);
        }

        Ok(parser.ast)
    }

    fn expression(&mut self) -> Result<&Expression<'src>, ParseError> {
        let token = self.peek_or("expression")?;
        if token.kind == TokenKind::Keyword && token.lexeme == "for" {
            return self.for_loop();
        }
        self.primary_expression()
    }

    fn primary_expression(&mut self) -> Result<&Expression<'src>, ParseError> {
        let token = self.peek_or("expression")?;
        match token.kind {
            TokenKind::Identifier => match self.peek_at(1).map(|t| t.kind) {
                Some(TokenKind::LeftParen) => self.call_expression(),
                Some(TokenKind::ColonColon) => self.constant_definition(),
                _ => {
                    let name = self.expect(TokenKind::Identifier)?;
                    Ok(self
                        .ast
                        .emplace_expression(ExpressionKind::Variable { name }, name.span))
                }
            },
            TokenKind::StringLiteral => {
                let token = self.expect(TokenKind::StringLiteral)?;
                Ok(self
                    .ast
                    .emplace_expression(ExpressionKind::StringLiteral { token }, token.span))
            }
            TokenKind::Number => self.number(),
            TokenKind::LeftBracket => self.list(),
            TokenKind::LeftParen => self.tuple(),
            _ => Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: token.kind,
                span: token.span,
            }),
        }
    }

    fn number(&mut self) -> Result<&Expression<'src>, ParseError> {
        let token = self.expect(TokenKind::Number)?;
        Ok(self
            .ast
            .emplace_expression(ExpressionKind::Number { token }, token.span))
    }

    fn list(&mut self) -> Result<&Expression<'src>, ParseError> {
        let open = self.expect(TokenKind::LeftBracket)?;
        let (elements, close) = self.elements_until(TokenKind::RightBracket)?;
        Ok(self.ast.emplace_expression(
            ExpressionKind::List { elements },
            Span::join(open.span, close.span),
        ))
    }

    fn tuple(&mut self) -> Result<&Expression<'src>, ParseError> {
        let open = self.expect(TokenKind::LeftParen)?;
        let (elements, close) = self.elements_until(TokenKind::RightParen)?;
        Ok(self.ast.emplace_expression(
            ExpressionKind::Tuple { elements },
            Span::join(open.span, close.span),
        ))
    }

    fn call_expression(&mut self) -> Result<&Expression<'src>, ParseError> {
        let identifier = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::LeftParen)?;
        let (arguments, close) = self.elements_until(TokenKind::RightParen)?;

        Ok(self.ast.emplace_expression(
            ExpressionKind::Call {
                identifier,
                arguments,
            },
            Span::join(identifier.span, close.span),
        ))
    }

    /// Comma-separated expressions up to (and including) the closing token.
    /// Commas are element separators but otherwise insignificant, so trailing
    /// and repeated commas parse fine.
    fn elements_until(
        &mut self,
        closer: TokenKind,
    ) -> Result<(Vec<ExpressionId>, Token<'src>), ParseError> {
        let mut elements = Vec::new();
        loop {
            let token = self.peek_or(closer.describe())?;
            if token.kind == closer {
                let close = self.expect(closer)?;
                return Ok((elements, close));
            }
            if token.kind == TokenKind::Comma {
                self.expect(TokenKind::Comma)?;
                continue;
            }
            elements.push(self.expression()?.id);
        }
    }

    fn constant_definition(&mut self) -> Result<&Expression<'src>, ParseError> {
        let name = self.expect(TokenKind::Identifier)?;
        self.expect(TokenKind::ColonColon)?;
        let value = self.primary_expression()?;
        let (value_id, value_span) = (value.id, value.span);

        Ok(self.ast.emplace_expression(
            ExpressionKind::Constant {
                name,
                value: value_id,
            },
            Span::join(name.span, value_span),
        ))
    }

    fn for_loop(&mut self) -> Result<&Expression<'src>, ParseError> {
        let for_token = self.expect(TokenKind::Keyword)?;
        let range = self.range()?.id;
        self.expect(TokenKind::LeftCurly)?;

        let mut body = Vec::new();
        loop {
            let token = self.peek_or("`}`")?;
            if token.kind == TokenKind::RightCurly {
                break;
            }
            body.push(self.expression()?.id);
        }
        let close = self.expect(TokenKind::RightCurly)?;

        Ok(self.ast.emplace_expression(
            ExpressionKind::For { range, body },
            Span::join(for_token.span, close.span),
        ))
    }

    fn range(&mut self) -> Result<&Expression<'src>, ParseError> {
        let start = self.expect(TokenKind::Number)?;
        self.expect(TokenKind::DotDot)?;
        let end = self.expect(TokenKind::Number)?;

        Ok(self.ast.emplace_expression(
            ExpressionKind::Range { start, end },
            Span::join(start.span, end.span),
        ))
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token<'src>, ParseError> {
        let token = self.next().ok_or(ParseError::UnexpectedEof {
            expected: expected.describe(),
        })?;
        if token.kind != expected {
            return Err(ParseError::UnexpectedToken {
                expected: expected.describe(),
                found: token.kind,
                span: token.span,
            });
        }
        Ok(token)
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'src>> {
        self.tokens.get(self.cursor + offset).copied()
    }

    fn peek_or(&self, expected: &'static str) -> Result<Token<'src>, ParseError> {
        self.peek_at(0)
            .ok_or(ParseError::UnexpectedEof { expected })
    }

    fn next(&mut self) -> Option<Token<'src>> {
        let token = self.peek_at(0)?;
        self.cursor += 1;
        Some(token)
    }

    fn has_more(&self) -> bool {
        self.cursor < self.tokens.len()
    }
}
