//! Recursive-descent parser.
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr ("or" and_expr)*
//! and_expr   := unary ("and" unary)*
//! unary      := "not" unary | predicate
//! predicate  := sum ( cmp_op sum | "exists" | "includes" sum )?
//! sum        := atom (("+" | "-") atom)*
//! atom       := number | string | "true" | "false" | path | symbol
//!             | "-" atom | "(" expr ")"
//! ```
//!
//! A symbol (a bare identifier that is not a role) stands for its own text
//! and may only be the whole right operand of a comparison or the needle of
//! `includes`. Anywhere else it is read as a path with an unknown root.

use world_model::Value;

use super::ast::{ArithOp, ContextPath, Expr};
use super::lexer::{tokenize, Spanned, Token};
use super::EvalError;
use crate::path::{parse_steps, Role};

/// Parse an expression string into a tree.
pub fn parse(source: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: source.len(),
    };
    let expr = parser.parse_or()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(syntax(extra.offset, "unexpected trailing input"));
    }
    Ok(expr)
}

fn syntax(offset: usize, message: impl Into<String>) -> EvalError {
    EvalError::SyntaxError {
        offset,
        message: message.into(),
    }
}

/// Split an identifier into a role path, or `None` for a plain symbol.
fn context_path(raw: &str, offset: usize) -> Result<Option<ContextPath>, EvalError> {
    let (head, rest) = match raw.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (raw, None),
    };

    if head.contains('[') || head.contains(']') {
        let name = head.split('[').next().unwrap_or_default();
        return match Role::parse(name) {
            Some(_) => Err(syntax(offset, format!("role '{}' cannot be indexed", name))),
            None => Err(EvalError::UnknownContextRoot {
                root: name.to_string(),
            }),
        };
    }

    let Some(role) = Role::parse(head) else {
        return match rest {
            Some(_) => Err(EvalError::UnknownContextRoot {
                root: head.to_string(),
            }),
            None => Ok(None),
        };
    };

    let steps = match rest {
        Some(rest) => parse_steps(raw, rest.split('.'))
            .map_err(|e| syntax(offset, e.to_string()))?,
        None => Vec::new(),
    };
    Ok(Some(ContextPath { role, steps }))
}

/// Fail on any symbol inside an operand that must be a value or path.
fn reject_symbols(expr: &Expr) -> Result<(), EvalError> {
    match expr {
        Expr::Symbol(raw) => Err(EvalError::UnknownContextRoot { root: raw.clone() }),
        Expr::Neg(inner) => reject_symbols(inner),
        Expr::Arith { lhs, rhs, .. } => {
            reject_symbols(lhs)?;
            reject_symbols(rhs)
        }
        _ => Ok(()),
    }
}

/// Right-hand operands may be a lone symbol.
fn check_operand(expr: &Expr) -> Result<(), EvalError> {
    match expr {
        Expr::Symbol(_) => Ok(()),
        other => reject_symbols(other),
    }
}

struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
    end: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|s| s.offset).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<&'t Spanned> {
        let spanned = self.tokens.get(self.pos);
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat(&Token::Not) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, EvalError> {
        let start = self.offset();
        let lhs = self.parse_sum()?;
        reject_symbols(&lhs)?;

        match self.peek() {
            Some(Token::Cmp(op)) => {
                self.pos += 1;
                let rhs = self.parse_sum()?;
                check_operand(&rhs)?;
                Ok(Expr::Compare {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            Some(Token::Exists) => {
                self.pos += 1;
                match lhs {
                    Expr::Path(path) => Ok(Expr::Exists(path)),
                    _ => Err(syntax(start, "'exists' needs a context path")),
                }
            }
            Some(Token::Includes) => {
                self.pos += 1;
                let needle = self.parse_sum()?;
                check_operand(&needle)?;
                Ok(Expr::Includes {
                    haystack: Box::new(lhs),
                    needle: Box::new(needle),
                })
            }
            _ => Ok(lhs),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_atom()?;
        while let Some(Token::Arith(op)) = self.peek() {
            self.pos += 1;
            let rhs = self.parse_atom()?;
            lhs = Expr::Arith {
                op: *op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        let Some(spanned) = self.advance() else {
            return Err(syntax(offset, "missing operand"));
        };

        match &spanned.token {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(*n))),
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s.clone()))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Ident(raw) => Ok(match context_path(raw, offset)? {
                Some(path) => Expr::Path(path),
                None => Expr::Symbol(raw.clone()),
            }),
            Token::Arith(ArithOp::Sub) => Ok(Expr::Neg(Box::new(self.parse_atom()?))),
            Token::LParen => {
                let inner = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(syntax(self.offset(), "unbalanced parentheses"));
                }
                Ok(inner)
            }
            Token::RParen => Err(syntax(offset, "unbalanced parentheses")),
            other => Err(syntax(offset, format!("expected an operand, found {:?}", other))),
        }
    }
}
