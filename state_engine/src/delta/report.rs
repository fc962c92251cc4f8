//! Applying deltas and reporting what happened.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use world_model::{EntityGraph, Value};

use super::{execute, Delta, DeltaError};
use crate::path::RoleBindings;

/// Unique identifier for an applied-delta audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaRecordId(pub Uuid);

impl DeltaRecordId {
    /// Create a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeltaRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DeltaRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit record for a delta that was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedDelta {
    pub id: DeltaRecordId,

    /// Position in the submitted batch.
    pub index: usize,

    /// Scene or reason tag carried by the delta.
    pub scene: Option<String>,

    pub delta: Delta,

    /// Value before the change, where a single value was replaced.
    pub before: Option<Value>,

    pub after: Option<Value>,

    /// False when the operation matched nothing (a `remove` that found no
    /// element).
    pub changed: bool,
}

/// A delta that could not be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaFailure {
    pub index: usize,
    pub delta: Delta,
    pub error: DeltaError,
}

impl DeltaFailure {
    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

/// Outcome of a batch. Deltas are applied independently, so both lists may
/// be non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub applied: Vec<AppliedDelta>,
    pub failures: Vec<DeltaFailure>,
}

impl BatchReport {
    /// True if every delta in the batch applied.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.applied.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, index: usize, delta: &Delta, outcome: Result<AppliedDelta, DeltaError>) {
        match outcome {
            Ok(applied) => self.applied.push(applied),
            Err(error) => self.failures.push(DeltaFailure {
                index,
                delta: delta.clone(),
                error,
            }),
        }
    }
}

fn apply_at(graph: &mut EntityGraph, delta: &Delta, index: usize) -> Result<AppliedDelta, DeltaError> {
    let target = delta.path().unwrap_or("assets.cash_ledger");
    match execute(graph, &delta.op) {
        Ok(change) => {
            let applied = AppliedDelta {
                id: DeltaRecordId::new(),
                index,
                scene: delta.scene.clone(),
                delta: delta.clone(),
                before: change.before,
                after: change.after,
                changed: change.changed,
            };
            debug!(
                record = %applied.id,
                index,
                op = delta.op_name(),
                path = target,
                changed = applied.changed,
                "delta applied"
            );
            Ok(applied)
        }
        Err(error) => {
            warn!(
                index,
                op = delta.op_name(),
                path = target,
                code = error.code(),
                error = %error,
                "delta rejected"
            );
            Err(error)
        }
    }
}

/// Apply a single delta.
pub fn apply(graph: &mut EntityGraph, delta: &Delta) -> Result<AppliedDelta, DeltaError> {
    apply_at(graph, delta, 0)
}

/// Apply deltas in order. A failure never stops the deltas after it and
/// nothing already applied is rolled back.
pub fn apply_batch(graph: &mut EntityGraph, deltas: &[Delta]) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, delta) in deltas.iter().enumerate() {
        let outcome = apply_at(graph, delta, index);
        report.record(index, delta, outcome);
    }
    finish(report)
}

/// Expand shorthand paths against `bindings`, then apply in order.
///
/// A delta whose shorthand cannot be expanded is reported as a failure like
/// any other.
pub fn apply_batch_with_bindings(
    graph: &mut EntityGraph,
    deltas: &[Delta],
    bindings: &RoleBindings,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (index, delta) in deltas.iter().enumerate() {
        let outcome = match delta.expand(bindings) {
            Ok(expanded) => apply_at(graph, &expanded, index),
            Err(error) => Err(DeltaError::from(error)),
        };
        report.record(index, delta, outcome);
    }
    finish(report)
}

fn finish(report: BatchReport) -> BatchReport {
    debug!(
        applied = report.applied.len(),
        failed = report.failures.len(),
        "delta batch finished"
    );
    report
}
