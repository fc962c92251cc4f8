//! Delta Engine - typed mutations of the entity graph.
//!
//! A [`Delta`] names one operation: `set`, `add`, `subtract`, `multiply`,
//! `append`, `remove` or `transfer`. Every operation except `transfer` goes
//! through the path resolver and the typed location it returns, so a value
//! that does not fit the field is rejected before anything changes.
//!
//! Deltas are plain serde data:
//!
//! ```json
//! {"op": "add", "path": "characters.char_varo.stats.wealth", "value": 20, "scene": "s3"}
//! {"op": "remove", "path": "characters.char_varo.beliefs", "match": {"claim": "Quintus is loyal"}}
//! {"op": "transfer", "from": "char_varo", "to": "char_quintus", "amount": 30}
//! ```

mod ledger;
mod report;

pub use ledger::{transfer, Settlement};
pub use report::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use world_model::{Addressable, EntityGraph, Match, SlotError, SlotRef, Value};

use crate::path::{
    expand_shorthand, parse_path, resolve, resolve_mut, PathError, PathStep, Role, RoleBindings,
};

/// Errors raised while validating or applying a delta.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeltaError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("type mismatch at '{path}': {detail}")]
    TypeMismatch { path: String, detail: String },

    #[error("'{holder}' holds {balance} denarii, cannot pay {amount}")]
    InsufficientFunds {
        holder: String,
        balance: u64,
        amount: u64,
    },

    #[error("no ledger entry for '{holder}'")]
    NoLedgerEntry { holder: String },

    #[error("transfer amount must be a positive whole number, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("{value} is out of range at '{path}' (expected {expected})")]
    OutOfRange {
        path: String,
        value: f64,
        expected: &'static str,
    },

    #[error("'{key}' is already taken at '{path}'")]
    DuplicateKey { path: String, key: String },
}

impl DeltaError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            DeltaError::Path(e) => e.code(),
            DeltaError::TypeMismatch { .. } => "TypeMismatch",
            DeltaError::InsufficientFunds { .. } => "InsufficientFunds",
            DeltaError::NoLedgerEntry { .. } => "NoLedgerEntry",
            DeltaError::InvalidAmount { .. } => "InvalidAmount",
            DeltaError::OutOfRange { .. } => "OutOfRange",
            DeltaError::DuplicateKey { .. } => "DuplicateKey",
        }
    }

    fn mismatch(path: &str, detail: impl Into<String>) -> Self {
        DeltaError::TypeMismatch {
            path: path.to_string(),
            detail: detail.into(),
        }
    }

    fn from_slot(path: &str, err: SlotError) -> Self {
        match err {
            SlotError::OutOfRange { value, expected } => DeltaError::OutOfRange {
                path: path.to_string(),
                value,
                expected,
            },
            SlotError::DuplicateKey(key) => DeltaError::DuplicateKey {
                path: path.to_string(),
                key,
            },
            other => DeltaError::mismatch(path, other.to_string()),
        }
    }
}

/// Selects the record to drop in a `remove`: the first whose `key` field
/// equals `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>", into = "BTreeMap<String, Value>")]
pub struct MatchSpec {
    pub key: String,
    pub value: Value,
}

impl MatchSpec {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, Value>> for MatchSpec {
    type Error = String;

    fn try_from(map: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "match specification needs exactly one key, got {}",
                map.len()
            ));
        }
        map.into_iter()
            .next()
            .map(|(key, value)| MatchSpec { key, value })
            .ok_or_else(|| "empty match specification".to_string())
    }
}

impl From<MatchSpec> for BTreeMap<String, Value> {
    fn from(spec: MatchSpec) -> Self {
        BTreeMap::from([(spec.key, spec.value)])
    }
}

/// The operation a delta performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DeltaOp {
    Set {
        path: String,
        value: Value,
    },
    Add {
        path: String,
        value: Value,
    },
    Subtract {
        path: String,
        value: Value,
    },
    Multiply {
        path: String,
        value: Value,
    },
    Append {
        path: String,
        value: Value,
    },
    Remove {
        path: String,
        #[serde(default)]
        value: Value,
        #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
        matching: Option<MatchSpec>,
    },
    Transfer {
        from: String,
        to: String,
        amount: f64,
    },
}

/// A single mutation request, with an optional scene tag for the audit
/// trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(flatten)]
    pub op: DeltaOp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
}

impl From<DeltaOp> for Delta {
    fn from(op: DeltaOp) -> Self {
        Self { op, scene: None }
    }
}

impl Delta {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Set {
            path: path.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Add {
            path: path.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn subtract(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Subtract {
            path: path.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn multiply(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Multiply {
            path: path.into(),
            value: value.into(),
        }
        .into()
    }

    pub fn append(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Append {
            path: path.into(),
            value: value.into(),
        }
        .into()
    }

    /// Remove the first element equal to `value`.
    pub fn remove(path: impl Into<String>, value: impl Into<Value>) -> Self {
        DeltaOp::Remove {
            path: path.into(),
            value: value.into(),
            matching: None,
        }
        .into()
    }

    /// Remove the first record whose `key` field equals `value`.
    pub fn remove_matching(
        path: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        DeltaOp::Remove {
            path: path.into(),
            value: Value::Null,
            matching: Some(MatchSpec::new(key, value)),
        }
        .into()
    }

    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        DeltaOp::Transfer {
            from: from.into(),
            to: to.into(),
            amount: amount as f64,
        }
        .into()
    }

    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = Some(scene.into());
        self
    }

    /// Operator name as it appears in the `op` tag.
    pub fn op_name(&self) -> &'static str {
        match self.op {
            DeltaOp::Set { .. } => "set",
            DeltaOp::Add { .. } => "add",
            DeltaOp::Subtract { .. } => "subtract",
            DeltaOp::Multiply { .. } => "multiply",
            DeltaOp::Append { .. } => "append",
            DeltaOp::Remove { .. } => "remove",
            DeltaOp::Transfer { .. } => "transfer",
        }
    }

    /// Target path; `transfer` has none.
    pub fn path(&self) -> Option<&str> {
        match &self.op {
            DeltaOp::Set { path, .. }
            | DeltaOp::Add { path, .. }
            | DeltaOp::Subtract { path, .. }
            | DeltaOp::Multiply { path, .. }
            | DeltaOp::Append { path, .. }
            | DeltaOp::Remove { path, .. } => Some(path),
            DeltaOp::Transfer { .. } => None,
        }
    }

    /// Rewrite shorthand paths against `bindings`.
    ///
    /// Transfer parties named `actor` or `target` are replaced by the bound
    /// character id.
    pub fn expand(&self, bindings: &RoleBindings) -> Result<Delta, PathError> {
        let mut expanded = self.clone();
        match &mut expanded.op {
            DeltaOp::Set { path, .. }
            | DeltaOp::Add { path, .. }
            | DeltaOp::Subtract { path, .. }
            | DeltaOp::Multiply { path, .. }
            | DeltaOp::Append { path, .. }
            | DeltaOp::Remove { path, .. } => *path = expand_shorthand(path, bindings)?,
            DeltaOp::Transfer { from, to, .. } => {
                *from = expand_party(from, bindings)?;
                *to = expand_party(to, bindings)?;
            }
        }
        Ok(expanded)
    }
}

fn expand_party(party: &str, bindings: &RoleBindings) -> Result<String, PathError> {
    match Role::parse(party) {
        Some(role @ (Role::Actor | Role::Target)) => bindings
            .get(role)
            .map(str::to_string)
            .ok_or(PathError::UnboundRole { role }),
        _ => Ok(party.to_string()),
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Subtract,
    Multiply,
}

impl Arith {
    fn apply(self, current: f64, operand: f64) -> f64 {
        match self {
            Arith::Add => current + operand,
            Arith::Subtract => current - operand,
            Arith::Multiply => current * operand,
        }
    }
}

/// What a successful operation did.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Change {
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub changed: bool,
}

impl Change {
    fn replaced(before: Value, after: Value) -> Self {
        Self {
            changed: before != after,
            before: Some(before),
            after: Some(after),
        }
    }
}

fn arith_operands(slot: SlotRef<'_>, path: &str, operand: &Value, arith: Arith) -> Result<(f64, f64), DeltaError> {
    let operand = operand
        .as_number()
        .ok_or_else(|| DeltaError::mismatch(path, format!("operand must be a number, found {}", operand.kind())))?;
    let current = slot
        .number()
        .ok_or_else(|| DeltaError::mismatch(path, format!("target must be a number, found {}", slot.kind())))?;
    let next = arith.apply(current, operand);
    slot.check_number(next)
        .map_err(|e| DeltaError::from_slot(path, e))?;
    Ok((current, next))
}

fn arithmetic(graph: &mut EntityGraph, path: &str, operand: &Value, arith: Arith) -> Result<Change, DeltaError> {
    let mut slot = resolve_mut(graph, path)?;
    let (current, next) = arith_operands(slot.view(), path, operand, arith)?;
    slot.store_number(next)
        .map_err(|e| DeltaError::from_slot(path, e))?;
    Ok(Change::replaced(Value::Number(current), Value::Number(next)))
}

/// The key `record` would carry after `value` is assigned at `rest` below it,
/// if that assignment touches the key field.
fn assigned_key<'v>(record: &dyn Addressable, rest: &[PathStep], value: &'v Value) -> Option<&'v str> {
    let key_field = record.key_field()?;
    match rest {
        [] => value.as_map()?.get(key_field)?.as_text(),
        [PathStep::Field(name)] if name == key_field => value.as_text(),
        _ => None,
    }
}

/// Reject a `set` that would give a record a key its list already holds.
fn check_key_unique(graph: &EntityGraph, path: &str, value: &Value) -> Result<(), DeltaError> {
    let parsed = parse_path(path)?;
    let mut slot = graph.root(parsed.root);
    for (i, step) in parsed.steps.iter().enumerate() {
        let Some(next) = slot.step(step.as_step()) else {
            return Ok(());
        };
        if let (SlotRef::Records(list), SlotRef::Record(record)) = (slot, next) {
            if let Some(key) = assigned_key(record, &parsed.steps[i + 1..], value) {
                if record.key() != Some(key) && list.position_of(key).is_some() {
                    return Err(DeltaError::DuplicateKey {
                        path: path.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }
        slot = next;
    }
    Ok(())
}

fn selector<'m>(value: &'m Value, matching: &'m Option<MatchSpec>) -> Match<'m> {
    match matching {
        Some(spec) => Match::FieldEquals {
            key: &spec.key,
            value: &spec.value,
        },
        None => Match::Equals(value),
    }
}

pub(crate) fn execute(graph: &mut EntityGraph, op: &DeltaOp) -> Result<Change, DeltaError> {
    match op {
        DeltaOp::Set { path, value } => {
            check_key_unique(graph, path, value)?;
            let mut slot = resolve_mut(graph, path)?;
            let before = slot.view().to_value();
            slot.assign(value).map_err(|e| DeltaError::from_slot(path, e))?;
            Ok(Change::replaced(before, slot.view().to_value()))
        }
        DeltaOp::Add { path, value } => arithmetic(graph, path, value, Arith::Add),
        DeltaOp::Subtract { path, value } => arithmetic(graph, path, value, Arith::Subtract),
        DeltaOp::Multiply { path, value } => arithmetic(graph, path, value, Arith::Multiply),
        DeltaOp::Append { path, value } => {
            let mut slot = resolve_mut(graph, path)?;
            let changed = slot.push(value).map_err(|e| DeltaError::from_slot(path, e))?;
            Ok(Change {
                before: None,
                after: Some(value.clone()),
                changed,
            })
        }
        DeltaOp::Remove {
            path,
            value,
            matching,
        } => {
            let mut slot = resolve_mut(graph, path)?;
            let removed = slot
                .remove_first(selector(value, matching))
                .map_err(|e| DeltaError::from_slot(path, e))?;
            Ok(Change {
                before: None,
                after: None,
                changed: removed,
            })
        }
        DeltaOp::Transfer { from, to, amount } => {
            let settlement = transfer(&mut graph.assets, from, to, *amount)?;
            Ok(Change::replaced(
                settlement.before_value(from, to),
                settlement.after_value(from, to),
            ))
        }
    }
}

/// Check every precondition of `delta` without mutating the graph.
///
/// Succeeds exactly when [`apply`] would succeed on the same graph.
pub fn validate(graph: &EntityGraph, delta: &Delta) -> Result<(), DeltaError> {
    match &delta.op {
        DeltaOp::Set { path, value } => {
            check_key_unique(graph, path, value)?;
            resolve(graph, path)?
                .check_assign(value)
                .map_err(|e| DeltaError::from_slot(path, e))
        }
        DeltaOp::Add { path, value } => {
            arith_operands(resolve(graph, path)?, path, value, Arith::Add).map(|_| ())
        }
        DeltaOp::Subtract { path, value } => {
            arith_operands(resolve(graph, path)?, path, value, Arith::Subtract).map(|_| ())
        }
        DeltaOp::Multiply { path, value } => {
            arith_operands(resolve(graph, path)?, path, value, Arith::Multiply).map(|_| ())
        }
        DeltaOp::Append { path, value } => resolve(graph, path)?
            .check_push(value)
            .map_err(|e| DeltaError::from_slot(path, e)),
        DeltaOp::Remove {
            path,
            value,
            matching,
        } => resolve(graph, path)?
            .position(selector(value, matching))
            .map(|_| ())
            .map_err(|e| DeltaError::from_slot(path, e)),
        DeltaOp::Transfer { from, to, amount } => {
            ledger::check_transfer(&graph.assets, from, to, *amount).map(|_| ())
        }
    }
}
