//! Role-bound evaluation context.

use tracing::debug;
use world_model::{Character, EntityGraph, Relationship, SlotRef, World};

use super::EvalError;
use crate::path::{Role, RoleBindings};

/// The entities an expression can see, one per role.
///
/// Every role is optional; touching a missing role fails with
/// `ContextNotAvailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext<'g> {
    actor: Option<&'g Character>,
    target: Option<&'g Character>,
    relationship: Option<&'g Relationship>,
    world: Option<&'g World>,
}

impl<'g> EvalContext<'g> {
    /// An empty context with no roles bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind roles from the graph.
    ///
    /// The world is always available. An id that is bound but missing from
    /// the graph leaves its role unavailable.
    pub fn from_bindings(graph: &'g EntityGraph, bindings: &RoleBindings) -> Self {
        let actor = bindings.actor.as_deref().and_then(|id| graph.character(id));
        let target = bindings.target.as_deref().and_then(|id| graph.character(id));
        let relationship = bindings
            .relationship
            .as_deref()
            .and_then(|id| graph.relationship(id));

        for (role, bound, found) in [
            (Role::Actor, bindings.actor.as_deref(), actor.is_some()),
            (Role::Target, bindings.target.as_deref(), target.is_some()),
            (Role::Relationship, bindings.relationship.as_deref(), relationship.is_some()),
        ] {
            if let (Some(id), false) = (bound, found) {
                debug!(role = %role, id, "bound entity not in graph");
            }
        }

        Self {
            actor,
            target,
            relationship,
            world: Some(&graph.world),
        }
    }

    pub fn with_actor(mut self, actor: &'g Character) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_target(mut self, target: &'g Character) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_relationship(mut self, relationship: &'g Relationship) -> Self {
        self.relationship = Some(relationship);
        self
    }

    pub fn with_world(mut self, world: &'g World) -> Self {
        self.world = Some(world);
        self
    }

    pub fn is_available(&self, role: Role) -> bool {
        self.root(role).is_ok()
    }

    /// Handle to the entity bound to `role`.
    pub fn root(&self, role: Role) -> Result<SlotRef<'g>, EvalError> {
        let slot = match role {
            Role::Actor => self.actor.map(|c| SlotRef::Record(c)),
            Role::Target => self.target.map(|c| SlotRef::Record(c)),
            Role::Relationship => self.relationship.map(|r| SlotRef::Record(r)),
            Role::World => self.world.map(|w| SlotRef::Record(w)),
        };
        slot.ok_or(EvalError::ContextNotAvailable { role })
    }
}
