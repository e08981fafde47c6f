//! Recursive-descent parser.
//!
//! Precedence, loosest first: `||`, `&&`, relations (`== != < <= > >= in`),
//! unary (`! -`), member access and calls.

use crate::ast::{BinaryOp, Expr, Literal};
use crate::error::{FilterError, FilterResult};
use crate::lexer::{tokenize, Spanned, Token};

pub(crate) fn parse(input: &str) -> FilterResult<Expr> {
    let mut parser = Parser {
        tokens: tokenize(input)?,
        pos: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {other:?} after expression"))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> FilterError {
        FilterError::Syntax {
            position: self.tokens[self.pos.min(self.tokens.len() - 1)].pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> FilterResult<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, found {:?}", self.peek())))
        }
    }

    fn or(&mut self) -> FilterResult<Expr> {
        let mut lhs = self.and()?;
        while *self.peek() == Token::Or {
            self.advance();
            let rhs = self.and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> FilterResult<Expr> {
        let mut lhs = self.relation()?;
        while *self.peek() == Token::And {
            self.advance();
            let rhs = self.relation()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn relation(&mut self) -> FilterResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::In => BinaryOp::In,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> FilterResult<Expr> {
        match self.peek() {
            Token::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            Token::Minus => {
                self.advance();
                if let Token::Int(n) = *self.peek() {
                    self.advance();
                    return i64::try_from(-i128::from(n))
                        .map(|n| Expr::Literal(Literal::Int(n)))
                        .map_err(|_| self.error(format!("integer literal out of range: -{n}")));
                }
                match self.unary()? {
                    Expr::Literal(Literal::Int(n)) => n
                        .checked_neg()
                        .map(|n| Expr::Literal(Literal::Int(n)))
                        .ok_or_else(|| self.error(format!("integer literal out of range: -({n})"))),
                    other => Ok(Expr::Neg(Box::new(other))),
                }
            }
            _ => self.member(),
        }
    }

    fn member(&mut self) -> FilterResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = match self.advance() {
                        Token::Ident(name) => name,
                        other => return Err(self.error(format!("expected field name, found {other:?}"))),
                    };
                    if *self.peek() == Token::LParen {
                        let args = self.arguments()?;
                        expr = Expr::Call {
                            target: Some(Box::new(expr)),
                            function: name,
                            args,
                        };
                    } else {
                        expr = Expr::Select {
                            operand: Box::new(expr),
                            field: name,
                        };
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.or()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index {
                        operand: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> FilterResult<Expr> {
        match self.advance() {
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    let args = self.arguments()?;
                    Ok(Expr::Call {
                        target: None,
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            Token::Int(n) => i64::try_from(n)
                .map(|n| Expr::Literal(Literal::Int(n)))
                .map_err(|_| self.error(format!("integer literal out of range: {n}"))),
            Token::True => Ok(Expr::Literal(Literal::Bool(true))),
            Token::False => Ok(Expr::Literal(Literal::Bool(false))),
            Token::LParen => {
                let expr = self.or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let items = self.sequence(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            Token::Eof => Err(self.error("unexpected end of expression")),
            other => Err(self.error(format!("unexpected {other:?}"))),
        }
    }

    fn arguments(&mut self) -> FilterResult<Vec<Expr>> {
        self.expect(Token::LParen)?;
        self.sequence(Token::RParen)
    }

    /// Comma-separated expressions up to and including `close`.
    fn sequence(&mut self, close: Token) -> FilterResult<Vec<Expr>> {
        let mut items = Vec::new();
        if *self.peek() == close {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.or()?);
            if *self.peek() == Token::Comma {
                self.advance();
            } else {
                self.expect(close.clone())?;
                return Ok(items);
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
