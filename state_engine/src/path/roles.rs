//! Role bindings and shorthand path expansion.

use serde::{Deserialize, Serialize};

use super::PathError;

/// A role an entity can play in an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Actor,
    Target,
    Relationship,
    World,
}

impl Role {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "actor" => Some(Role::Actor),
            "target" => Some(Role::Target),
            "relationship" => Some(Role::Relationship),
            "world" => Some(Role::World),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Actor => "actor",
            Role::Target => "target",
            Role::Relationship => "relationship",
            Role::World => "world",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which entities fill the roles of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBindings {
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
}

impl RoleBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, id: impl Into<String>) -> Self {
        self.actor = Some(id.into());
        self
    }

    pub fn with_target(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    pub fn with_relationship(mut self, id: impl Into<String>) -> Self {
        self.relationship = Some(id.into());
        self
    }

    /// Bound id for an entity role. `World` has no id.
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Actor => self.actor.as_deref(),
            Role::Target => self.target.as_deref(),
            Role::Relationship => self.relationship.as_deref(),
            Role::World => None,
        }
    }

    fn require(&self, role: Role) -> Result<&str, PathError> {
        self.get(role).ok_or(PathError::UnboundRole { role })
    }
}

/// Rewrite a role-relative path into an absolute one.
///
/// `actor.x` becomes `characters.<actor>.x`, `target.x` becomes
/// `characters.<target>.x` and `relationship.x` becomes
/// `relationships.edges.<relationship>.x`. Any other path, including every
/// absolute path, is returned unchanged.
pub fn expand_shorthand(path: &str, bindings: &RoleBindings) -> Result<String, PathError> {
    let Some((head, rest)) = path.split_once('.') else {
        return Ok(path.to_string());
    };

    let expanded = match Role::parse(head) {
        Some(role @ (Role::Actor | Role::Target)) => {
            format!("characters.{}.{}", bindings.require(role)?, rest)
        }
        Some(Role::Relationship) => {
            format!(
                "relationships.edges.{}.{}",
                bindings.require(Role::Relationship)?,
                rest
            )
        }
        Some(Role::World) | None => path.to_string(),
    };
    Ok(expanded)
}
