//! Character definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::addressable;

/// Tag that marks a character as a principal regardless of stats.
pub const PRINCIPAL_TAG: &str = "principal";

/// Stats consulted when deciding whether a character is a principal.
const STANDING_STATS: [&str; 2] = ["auctoritas", "influence"];

/// A full character definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub faction_id: Option<String>,

    /// Numeric stats (wealth, influence, ruthlessness, ...).
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,

    // Belief-desire-intention state
    #[serde(default)]
    pub beliefs: Vec<Belief>,
    #[serde(default)]
    pub desires: Vec<String>,
    #[serde(default)]
    pub intentions: Vec<String>,

    #[serde(default)]
    pub emotional_state: String,

    /// Archetype tags (e.g. "principal", "schemer").
    #[serde(default)]
    pub tags: Vec<String>,
}

addressable!(Character, key = id {
    "id" => id: Text,
    "name" => name: Text,
    "title" => title: OptText,
    "faction_id" => faction_id: OptText,
    "stats" => stats: Numbers,
    "beliefs" => beliefs: Records,
    "desires" => desires: Texts,
    "intentions" => intentions: Texts,
    "emotional_state" => emotional_state: Text,
    "tags" => tags: Texts,
});

impl Character {
    /// Create a new character with the given id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: None,
            faction_id: None,
            stats: BTreeMap::new(),
            beliefs: Vec::new(),
            desires: Vec::new(),
            intentions: Vec::new(),
            emotional_state: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_stat(mut self, name: impl Into<String>, value: f64) -> Self {
        self.stats.insert(name.into(), value);
        self
    }

    pub fn with_belief(mut self, claim: impl Into<String>, confidence: f64) -> Self {
        self.beliefs.push(Belief::new(claim, confidence));
        self
    }

    pub fn with_desire(mut self, desire: impl Into<String>) -> Self {
        self.desires.push(desire.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_faction(mut self, faction_id: impl Into<String>) -> Self {
        self.faction_id = Some(faction_id.into());
        self
    }

    /// Get a stat by name.
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.get(name).copied()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// A principal carries the story: high standing or an explicit tag.
    pub fn is_principal(&self, threshold: f64) -> bool {
        self.has_tag(PRINCIPAL_TAG)
            || STANDING_STATS
                .iter()
                .filter_map(|s| self.stat(s))
                .any(|v| v >= threshold)
    }

    /// Beliefs ordered by confidence (highest first), ties in stored order.
    pub fn strongest_beliefs(&self, limit: usize) -> Vec<&Belief> {
        let mut beliefs: Vec<_> = self.beliefs.iter().collect();
        beliefs.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        beliefs.truncate(limit);
        beliefs
    }
}

/// Something a character holds to be true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Belief {
    pub claim: String,
    /// Confidence from 0.0 to 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

addressable!(Belief {
    "claim" => claim: Text,
    "confidence" => confidence: Number,
});

impl Belief {
    pub fn new(claim: impl Into<String>, confidence: f64) -> Self {
        Self {
            claim: claim.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
