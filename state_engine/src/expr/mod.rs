//! Expression Evaluator - prerequisite conditions over role-bound state.
//!
//! Expressions read the entities bound to `actor`, `target`,
//! `relationship` and `world`:
//!
//! ```text
//! actor.stats.wealth > 50
//! actor.stats.wealth - target.stats.wealth >= 10
//! relationship.weights.trust > 60 and not relationship.flags.public_feud
//! target.stats.piety exists
//! actor.tags includes 'principal'
//! ```
//!
//! Evaluation happens in three stages: tokenize, parse into an [`Expr`]
//! tree, then walk the tree against an [`EvalContext`].

mod ast;
mod context;
mod eval;
mod lexer;
mod parser;
mod prereqs;

pub use ast::*;
pub use context::EvalContext;
pub use eval::truthy;
pub use parser::parse;
pub use prereqs::*;

use thiserror::Error;
use world_model::Value;

use crate::path::Role;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown context root '{root}'")]
    UnknownContextRoot { root: String },

    #[error("'{role}' is not available in this context")]
    ContextNotAvailable { role: Role },

    #[error("syntax error at offset {offset}: {message}")]
    SyntaxError { offset: usize, message: String },

    #[error("'{path}' not found")]
    PathNotFound { path: String },

    #[error("type mismatch: {detail}")]
    TypeMismatch { detail: String },
}

impl EvalError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnknownContextRoot { .. } => "UnknownContextRoot",
            EvalError::ContextNotAvailable { .. } => "ContextNotAvailable",
            EvalError::SyntaxError { .. } => "SyntaxError",
            EvalError::PathNotFound { .. } => "PathNotFound",
            EvalError::TypeMismatch { .. } => "TypeMismatch",
        }
    }
}

/// A parsed expression, ready to evaluate any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    tree: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        Ok(Self {
            source: source.to_string(),
            tree: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        eval::eval(&self.tree, ctx)
    }
}

/// Parse and evaluate `source` against `ctx`.
pub fn evaluate(source: &str, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    eval::eval(&parse(source)?, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RoleBindings;
    use world_model::{Character, EntityGraph, Relationship};

    fn graph() -> EntityGraph {
        let mut graph = EntityGraph::new()
            .with_character(
                Character::new("char_varo", "Varo")
                    .with_stat("wealth", 80.0)
                    .with_stat("auctoritas", 75.0)
                    .with_tag("principal")
                    .with_belief("Quintus is loyal", 0.6),
            )
            .with_character(Character::new("char_quintus", "Quintus").with_stat("wealth", 30.0))
            .with_relationship(
                Relationship::new("char_varo", "char_quintus", "patron")
                    .with_weight("trust", 65.0)
                    .with_flag("transactional"),
            );
        graph.world.stats.insert("unrest".into(), 40.0);
        graph
    }

    fn full_bindings() -> RoleBindings {
        RoleBindings::new()
            .with_actor("char_varo")
            .with_target("char_quintus")
            .with_relationship("rel_char_varo_char_quintus")
    }

    fn eval_with(source: &str, bindings: &RoleBindings) -> Result<Value, EvalError> {
        let graph = graph();
        let ctx = EvalContext::from_bindings(&graph, bindings);
        evaluate(source, &ctx)
    }

    fn eval_full(source: &str) -> Result<Value, EvalError> {
        eval_with(source, &full_bindings())
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(eval_full("actor.stats.wealth > 50"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("target.stats.wealth >= 50"), Ok(Value::Bool(false)));
        assert_eq!(eval_full("actor.stats.wealth == 80"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("actor.stats.wealth != 80"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_path_against_path() {
        assert_eq!(
            eval_full("actor.stats.wealth > target.stats.wealth"),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_arithmetic_before_comparison() {
        assert_eq!(
            eval_full("actor.stats.wealth - target.stats.wealth >= 50"),
            Ok(Value::Bool(true))
        );
        assert_eq!(eval_full("actor.stats.wealth + 5"), Ok(Value::Number(85.0)));
        assert_eq!(eval_full("-actor.stats.wealth < 0"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_text_equality_with_symbol() {
        assert_eq!(eval_full("relationship.type == patron"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("relationship.type == 'rival'"), Ok(Value::Bool(false)));
        assert_eq!(eval_full("actor.name == \"Varo\""), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_flags_and_logic() {
        assert_eq!(
            eval_full("relationship.weights.trust > 60 and relationship.flags.transactional"),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval_full("not relationship.flags.transactional or world.stats.unrest < 50"),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval_full("(actor.stats.wealth > 90 or target.stats.wealth > 20) and true"),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_exists() {
        assert_eq!(eval_full("target.stats.wealth exists"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("target.stats.piety exists"), Ok(Value::Bool(false)));
        assert_eq!(eval_full("actor.beliefs[0] exists"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("actor.beliefs[3] exists"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_includes() {
        assert_eq!(eval_full("actor.tags includes 'principal'"), Ok(Value::Bool(true)));
        assert_eq!(eval_full("target.tags includes principal"), Ok(Value::Bool(false)));
        assert_eq!(eval_full("actor.name includes 'V'").unwrap_err().code(), "TypeMismatch");
    }

    #[test]
    fn test_missing_property_is_not_found() {
        assert_eq!(
            eval_full("actor.stats.piety > 5"),
            Err(EvalError::PathNotFound {
                path: "actor.stats.piety".into()
            })
        );
    }

    #[test]
    fn test_unbound_target() {
        let bindings = RoleBindings::new().with_actor("char_varo");
        assert_eq!(
            eval_with("target.stats.wealth > 50", &bindings),
            Err(EvalError::ContextNotAvailable { role: Role::Target })
        );
        assert_eq!(
            eval_with("target.stats.wealth exists", &bindings).unwrap_err().code(),
            "ContextNotAvailable"
        );
    }

    #[test]
    fn test_bound_but_missing_entity_is_unavailable() {
        let bindings = RoleBindings::new().with_actor("char_nobody");
        assert_eq!(
            eval_with("actor.stats.wealth > 1", &bindings).unwrap_err().code(),
            "ContextNotAvailable"
        );
    }

    #[test]
    fn test_ordering_on_text_is_type_mismatch() {
        assert_eq!(eval_full("actor.name > 5").unwrap_err().code(), "TypeMismatch");
        assert_eq!(eval_full("actor.name + 1 > 5").unwrap_err().code(), "TypeMismatch");
        assert_eq!(eval_full("not actor.name").unwrap_err().code(), "TypeMismatch");
    }

    #[test]
    fn test_short_circuit_skips_unbound_role() {
        let bindings = RoleBindings::new().with_actor("char_varo");
        assert_eq!(
            eval_with("actor.stats.wealth < 10 and target.stats.wealth > 1", &bindings),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_manual_context() {
        let varo = Character::new("char_varo", "Varo").with_stat("wealth", 80.0);
        let ctx = EvalContext::new().with_actor(&varo);
        assert_eq!(evaluate("actor.stats.wealth > 50", &ctx), Ok(Value::Bool(true)));
        assert!(!ctx.is_available(Role::World));
    }

    #[test]
    fn test_compiled_expression_reuse() {
        let graph = graph();
        let ctx = EvalContext::from_bindings(&graph, &full_bindings());
        let expr = Expression::parse("relationship.weights.trust > 60").unwrap();

        assert_eq!(expr.source(), "relationship.weights.trust > 60");
        assert_eq!(expr.evaluate(&ctx), expr.evaluate(&ctx));
        assert_eq!(expr.evaluate(&ctx), Ok(Value::Bool(true)));
    }
}
