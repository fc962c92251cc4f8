//! Named prerequisite checks evaluated as a batch.

use serde::{Deserialize, Serialize};
use tracing::debug;
use world_model::Value;

use super::eval::truthy;
use super::{evaluate, EvalContext, EvalError};

/// A named condition gating an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prereq {
    pub name: String,
    pub expr: String,
}

impl Prereq {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrereqStatus {
    Passed,
    Failed,
    Error(EvalError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrereqResult {
    pub name: String,
    pub expr: String,
    /// Evaluated value, absent on error.
    pub value: Option<Value>,
    pub status: PrereqStatus,
}

impl PrereqResult {
    pub fn passed(&self) -> bool {
        self.status == PrereqStatus::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrereqReport {
    pub results: Vec<PrereqResult>,
    pub all_passed: bool,
}

impl PrereqReport {
    pub fn failures(&self) -> impl Iterator<Item = &PrereqResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}

fn check(prereq: &Prereq, ctx: &EvalContext<'_>) -> PrereqResult {
    let (value, status) = match evaluate(&prereq.expr, ctx) {
        Ok(value) => {
            let status = match truthy(&value) {
                Some(true) => PrereqStatus::Passed,
                _ => PrereqStatus::Failed,
            };
            (Some(value), status)
        }
        Err(error) => {
            debug!(name = %prereq.name, code = error.code(), error = %error, "prereq errored");
            (None, PrereqStatus::Error(error))
        }
    };

    PrereqResult {
        name: prereq.name.clone(),
        expr: prereq.expr.clone(),
        value,
        status,
    }
}

/// Evaluate every prerequisite in order.
///
/// `all_passed` is true only when every expression evaluated without error
/// to a truthy value. An empty list passes.
pub fn evaluate_prereqs(prereqs: &[Prereq], ctx: &EvalContext<'_>) -> PrereqReport {
    let results: Vec<PrereqResult> = prereqs.iter().map(|p| check(p, ctx)).collect();
    let all_passed = results.iter().all(PrereqResult::passed);
    PrereqReport { results, all_passed }
}
