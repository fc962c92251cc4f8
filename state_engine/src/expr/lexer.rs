//! Tokenizer for prerequisite expressions.

use super::ast::{ArithOp, CmpOp};
use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// Bare identifier or dotted path (`actor.stats.wealth`, `beliefs[0]`).
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    Exists,
    Includes,
    Cmp(CmpOp),
    Arith(ArithOp),
    LParen,
    RParen,
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')
}

fn keyword(word: &str) -> Option<Token> {
    match word {
        "true" => Some(Token::True),
        "false" => Some(Token::False),
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "exists" => Some(Token::Exists),
        "includes" => Some(Token::Includes),
        _ => None,
    }
}

fn syntax(offset: usize, message: impl Into<String>) -> EvalError {
    EvalError::SyntaxError {
        offset,
        message: message.into(),
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = if c.is_ascii_digit() {
            let mut end = offset;
            while let Some(&(i, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[offset..end];
            let n = text
                .parse::<f64>()
                .map_err(|_| syntax(offset, format!("invalid number '{}'", text)))?;
            Token::Number(n)
        } else if is_ident_start(c) {
            let mut end = offset;
            while let Some(&(i, d)) = chars.peek() {
                if is_ident_char(d) {
                    end = i + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let word = &source[offset..end];
            keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()))
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            for (_, d) in chars.by_ref() {
                if d == c {
                    closed = true;
                    break;
                }
                text.push(d);
            }
            if !closed {
                return Err(syntax(offset, "unterminated string"));
            }
            Token::Str(text)
        } else {
            chars.next();
            let next = chars.peek().map(|&(_, d)| d);
            let (token, width) = match (c, next) {
                ('=', Some('=')) => (Token::Cmp(CmpOp::Eq), 2),
                ('!', Some('=')) => (Token::Cmp(CmpOp::Ne), 2),
                ('>', Some('=')) => (Token::Cmp(CmpOp::Ge), 2),
                ('<', Some('=')) => (Token::Cmp(CmpOp::Le), 2),
                ('>', _) => (Token::Cmp(CmpOp::Gt), 1),
                ('<', _) => (Token::Cmp(CmpOp::Lt), 1),
                ('+', _) => (Token::Arith(ArithOp::Add), 1),
                ('-', _) => (Token::Arith(ArithOp::Sub), 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                _ => return Err(syntax(offset, format!("unknown token '{}'", c))),
            };
            if width == 2 {
                chars.next();
            }
            token
        };

        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}
