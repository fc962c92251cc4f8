//! Secrets: knowledge some characters hold about others.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::value::{addressable, keyword};

/// Whether a secret still has narrative weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecretStatus {
    #[default]
    Active,
    /// Exposed, disproved, or otherwise spent.
    Inactive,
}

keyword!(SecretStatus {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub id: String,
    #[serde(default)]
    pub description: String,

    /// Characters who know the secret.
    #[serde(default)]
    pub holders: BTreeSet<String>,

    /// Characters the secret is about.
    #[serde(default)]
    pub subjects: BTreeSet<String>,

    #[serde(default)]
    pub status: SecretStatus,

    /// Value as evidence in court.
    #[serde(default)]
    pub legal_value: f64,

    /// Harm done by public exposure.
    #[serde(default)]
    pub public_damage: f64,
}

addressable!(Secret, key = id {
    "id" => id: Text,
    "description" => description: Text,
    "holders" => holders: Ids,
    "subjects" => subjects: Ids,
    "status" => status: Keyword,
    "legal_value" => legal_value: Number,
    "public_damage" => public_damage: Number,
});

impl Secret {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            holders: BTreeSet::new(),
            subjects: BTreeSet::new(),
            status: SecretStatus::Active,
            legal_value: 0.0,
            public_damage: 0.0,
        }
    }

    pub fn with_holder(mut self, id: impl Into<String>) -> Self {
        self.holders.insert(id.into());
        self
    }

    pub fn with_subject(mut self, id: impl Into<String>) -> Self {
        self.subjects.insert(id.into());
        self
    }

    pub fn with_impact(mut self, legal_value: f64, public_damage: f64) -> Self {
        self.legal_value = legal_value;
        self.public_damage = public_damage;
        self
    }

    pub fn with_status(mut self, status: SecretStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == SecretStatus::Active
    }

    /// Combined impact used for ranking.
    pub fn severity(&self) -> f64 {
        self.legal_value + self.public_damage
    }

    /// Whether any holder or subject is among `participants`.
    pub fn involves_any(&self, participants: &BTreeSet<String>) -> bool {
        self.holders
            .iter()
            .chain(self.subjects.iter())
            .any(|id| participants.contains(id))
    }

    /// Active and involving at least one participant.
    pub fn is_relevant_to(&self, participants: &BTreeSet<String>) -> bool {
        self.is_active() && self.involves_any(participants)
    }
}
