//! Tree-walking interpreter.

use world_model::Value;

use super::ast::{ArithOp, CmpOp, ContextPath, Expr};
use super::{EvalContext, EvalError};
use crate::path::descend;

fn mismatch(detail: impl Into<String>) -> EvalError {
    EvalError::TypeMismatch {
        detail: detail.into(),
    }
}

fn number(value: &Value, what: &str) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| mismatch(format!("{} needs a number, found {}", what, value.kind())))
}

/// Truth value for logical operators: booleans, and numbers (non-zero is
/// true).
pub fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(*n != 0.0),
        _ => None,
    }
}

fn condition(value: &Value, what: &str) -> Result<bool, EvalError> {
    truthy(value).ok_or_else(|| mismatch(format!("'{}' needs a boolean, found {}", what, value.kind())))
}

fn lookup(path: &ContextPath, ctx: &EvalContext<'_>) -> Result<Option<Value>, EvalError> {
    let root = ctx.root(path.role)?;
    Ok(descend(root, &path.steps).ok().map(|slot| slot.to_value()))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq => Ok(lhs == rhs),
        CmpOp::Ne => Ok(lhs != rhs),
        ordering => {
            let what = format!("'{}'", ordering.as_str());
            let (a, b) = (number(lhs, &what)?, number(rhs, &what)?);
            Ok(match ordering {
                CmpOp::Gt => a > b,
                CmpOp::Lt => a < b,
                CmpOp::Ge => a >= b,
                _ => a <= b,
            })
        }
    }
}

/// Evaluate a parsed expression.
pub fn eval(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Symbol(name) => Ok(Value::Text(name.clone())),
        Expr::Path(path) => lookup(path, ctx)?.ok_or_else(|| EvalError::PathNotFound {
            path: path.to_string(),
        }),
        Expr::Neg(inner) => {
            let n = number(&eval(inner, ctx)?, "'-'")?;
            Ok(Value::Number(-n))
        }
        Expr::Arith { op, lhs, rhs } => {
            let what = match op {
                ArithOp::Add => "'+'",
                ArithOp::Sub => "'-'",
            };
            let a = number(&eval(lhs, ctx)?, what)?;
            let b = number(&eval(rhs, ctx)?, what)?;
            Ok(Value::Number(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
            }))
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            compare(*op, &lhs, &rhs).map(Value::Bool)
        }
        Expr::Exists(path) => Ok(Value::Bool(lookup(path, ctx)?.is_some())),
        Expr::Includes { haystack, needle } => {
            let haystack = eval(haystack, ctx)?;
            let needle = eval(needle, ctx)?;
            match haystack.as_list() {
                Some(items) => Ok(Value::Bool(items.contains(&needle))),
                None => Err(mismatch(format!(
                    "'includes' needs a list, found {}",
                    haystack.kind()
                ))),
            }
        }
        Expr::Not(inner) => Ok(Value::Bool(!condition(&eval(inner, ctx)?, "not")?)),
        Expr::And(lhs, rhs) => {
            if !condition(&eval(lhs, ctx)?, "and")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(condition(&eval(rhs, ctx)?, "and")?))
        }
        Expr::Or(lhs, rhs) => {
            if condition(&eval(lhs, ctx)?, "or")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(condition(&eval(rhs, ctx)?, "or")?))
        }
    }
}
