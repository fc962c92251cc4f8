//! Path Resolver - turns dotted addresses into typed locations.
//!
//! A path is a root followed by one or more segments:
//!
//! ```text
//! characters.char_varo.stats.wealth
//! characters.char_varo.beliefs[0].claim
//! relationships.rel_varo_quintus.weights.trust
//! ```
//!
//! Directly under a collection root a segment is an entity id, found by a
//! linear scan. `field[idx]` indexes into a sequence and may be chained.
//! Resolution never creates anything; a missing step is `PathNotFound`.

mod roles;

pub use roles::*;

use std::fmt;
use thiserror::Error;
use world_model::{EntityGraph, Root, Slot, SlotRef, Step, Value};

/// Errors raised while parsing or resolving a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("unknown root '{root}'")]
    UnknownRoot { root: String },

    #[error("malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: &'static str },

    #[error("path '{path}' not found at '{segment}'")]
    PathNotFound { path: String, segment: String },

    #[error("role '{role}' is not bound")]
    UnboundRole { role: Role },
}

impl PathError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            PathError::UnknownRoot { .. } => "UnknownRoot",
            PathError::MalformedPath { .. } => "MalformedPath",
            PathError::PathNotFound { .. } => "PathNotFound",
            PathError::UnboundRole { .. } => "UnboundRole",
        }
    }

    fn malformed(path: &str, reason: &'static str) -> Self {
        PathError::MalformedPath {
            path: path.to_string(),
            reason,
        }
    }
}

/// One parsed segment after the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

impl PathStep {
    pub fn as_step(&self) -> Step<'_> {
        match self {
            PathStep::Field(name) => Step::Field(name),
            PathStep::Index(i) => Step::Index(*i),
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Field(name) => f.write_str(name),
            PathStep::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A path split into its root and steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub root: Root,
    pub steps: Vec<PathStep>,
}

impl ParsedPath {
    /// Resolve to a shared handle.
    pub fn resolve<'g>(&self, graph: &'g EntityGraph) -> Result<SlotRef<'g>, PathError> {
        descend(graph.root(self.root), &self.steps).map_err(|at| self.not_found(at))
    }

    /// Resolve to a mutable handle.
    pub fn resolve_mut<'g>(&self, graph: &'g mut EntityGraph) -> Result<Slot<'g>, PathError> {
        let mut slot = graph.root_mut(self.root);
        for (i, step) in self.steps.iter().enumerate() {
            slot = slot.step(step.as_step()).ok_or_else(|| self.not_found(i))?;
        }
        Ok(slot)
    }

    fn not_found(&self, at: usize) -> PathError {
        PathError::PathNotFound {
            path: self.to_string(),
            segment: self
                .steps
                .get(at)
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for ParsedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root.as_str())?;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => write!(f, ".{}", name)?,
                PathStep::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

/// Walk `steps` from `start`; on failure returns the index of the step
/// that did not exist.
pub fn descend<'a>(start: SlotRef<'a>, steps: &[PathStep]) -> Result<SlotRef<'a>, usize> {
    let mut slot = start;
    for (i, step) in steps.iter().enumerate() {
        slot = slot.step(step.as_step()).ok_or(i)?;
    }
    Ok(slot)
}

/// Parse the segments that follow a root.
///
/// `path` is only used for error messages.
pub fn parse_steps<'p>(
    path: &str,
    segments: impl IntoIterator<Item = &'p str>,
) -> Result<Vec<PathStep>, PathError> {
    let mut steps = Vec::new();
    for segment in segments {
        if segment.is_empty() {
            return Err(PathError::malformed(path, "empty segment"));
        }

        let (name, mut brackets) = match segment.find('[') {
            Some(open) => segment.split_at(open),
            None => (segment, ""),
        };
        if name.is_empty() {
            return Err(PathError::malformed(path, "index without a field name"));
        }
        if name.contains(']') {
            return Err(PathError::malformed(path, "unbalanced bracket"));
        }
        steps.push(PathStep::Field(name.to_string()));

        while !brackets.is_empty() {
            let Some(inner) = brackets.strip_prefix('[') else {
                return Err(PathError::malformed(path, "unexpected text after index"));
            };
            let Some(close) = inner.find(']') else {
                return Err(PathError::malformed(path, "unclosed bracket"));
            };
            let index = inner[..close]
                .parse::<usize>()
                .map_err(|_| PathError::malformed(path, "index must be a non-negative integer"))?;
            steps.push(PathStep::Index(index));
            brackets = &inner[close + 1..];
        }
    }
    Ok(steps)
}

/// Parse an absolute path.
pub fn parse_path(path: &str) -> Result<ParsedPath, PathError> {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();

    if head.is_empty() {
        return Err(PathError::malformed(path, "empty segment"));
    }
    if rest.is_empty() {
        return Err(PathError::malformed(path, "expected a root and at least one field"));
    }
    if head.contains('[') || head.contains(']') {
        return Err(PathError::malformed(path, "root cannot be indexed"));
    }

    let root = Root::parse(head).ok_or_else(|| PathError::UnknownRoot {
        root: head.to_string(),
    })?;
    let mut steps = parse_steps(path, rest)?;

    // `relationships.<id>` is shorthand for `relationships.edges.<id>`.
    if root == Root::Relationships {
        if let Some(PathStep::Field(first)) = steps.first() {
            if first != "edges" {
                steps.insert(0, PathStep::Field("edges".to_string()));
            }
        }
    }

    Ok(ParsedPath { root, steps })
}

/// Resolve `path` to a shared location handle.
pub fn resolve<'g>(graph: &'g EntityGraph, path: &str) -> Result<SlotRef<'g>, PathError> {
    parse_path(path)?.resolve(graph)
}

/// Resolve `path` to a mutable location handle.
pub fn resolve_mut<'g>(graph: &'g mut EntityGraph, path: &str) -> Result<Slot<'g>, PathError> {
    parse_path(path)?.resolve_mut(graph)
}

/// Read the value at `path`.
pub fn read(graph: &EntityGraph, path: &str) -> Result<Value, PathError> {
    resolve(graph, path).map(|slot| slot.to_value())
}
