//! Engine configuration.
//!
//! Every field has a default, so a TOML document only needs to name the
//! values it overrides:
//!
//! ```toml
//! principal_threshold = 65.0
//!
//! [retrieval]
//! k = 3
//! max_relationships = 20
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Parse(_) => "ConfigParse",
        }
    }
}

/// Limits for the k-hop retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum traversal depth from the seeds.
    pub k: usize,

    /// Maximum number of relationships returned.
    pub max_relationships: usize,

    /// Maximum number of secrets returned.
    pub max_secrets: usize,

    /// Beliefs listed per participant.
    pub max_beliefs_per_character: usize,

    /// Maximum number of open threads returned.
    pub max_threads: usize,

    /// Also consider secrets that are no longer active.
    pub include_inactive_secrets: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_relationships: 15,
            max_secrets: 5,
            max_beliefs_per_character: 3,
            max_threads: 5,
            include_inactive_secrets: false,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Auctoritas or influence at or above this marks a principal.
    pub principal_threshold: f64,

    pub retrieval: RetrievalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            principal_threshold: 70.0,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document, filling unspecified values with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
