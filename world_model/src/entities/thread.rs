//! Narrative threads and factions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::value::{addressable, keyword};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Open,
    Resolved,
}

keyword!(ThreadStatus {
    Open => "open",
    Resolved => "resolved",
});

/// An ongoing storyline that should keep moving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: ThreadStatus,
    #[serde(default)]
    pub priority: u64,
    #[serde(default)]
    pub episodes_since_progress: u64,
    /// Cadence: how many episodes may pass without progress.
    #[serde(default = "default_cadence")]
    pub max_episodes_without_progress: u64,
    #[serde(default)]
    pub participants: BTreeSet<String>,
}

fn default_cadence() -> u64 {
    3
}

addressable!(Thread, key = id {
    "id" => id: Text,
    "title" => title: Text,
    "status" => status: Keyword,
    "priority" => priority: Count,
    "episodes_since_progress" => episodes_since_progress: Count,
    "max_episodes_without_progress" => max_episodes_without_progress: Count,
    "participants" => participants: Ids,
});

impl Thread {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: ThreadStatus::Open,
            priority: 0,
            episodes_since_progress: 0,
            max_episodes_without_progress: default_cadence(),
            participants: BTreeSet::new(),
        }
    }

    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_cadence(mut self, max_episodes_without_progress: u64) -> Self {
        self.max_episodes_without_progress = max_episodes_without_progress;
        self
    }

    pub fn with_participant(mut self, id: impl Into<String>) -> Self {
        self.participants.insert(id.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == ThreadStatus::Open
    }

    /// Open and stalled for at least its cadence.
    pub fn is_urgent(&self) -> bool {
        self.is_open() && self.episodes_since_progress >= self.max_episodes_without_progress
    }

    /// Record progress, resetting the stall counter.
    pub fn mark_progress(&mut self) {
        self.episodes_since_progress = 0;
    }

    pub fn resolve(&mut self) {
        self.status = ThreadStatus::Resolved;
    }
}

/// A political or social faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub resources: BTreeMap<String, f64>,
    #[serde(default)]
    pub members: BTreeSet<String>,
}

addressable!(Faction, key = id {
    "id" => id: Text,
    "name" => name: Text,
    "alignment" => alignment: Text,
    "resources" => resources: Numbers,
    "members" => members: Ids,
});

impl Faction {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            alignment: String::new(),
            resources: BTreeMap::new(),
            members: BTreeSet::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: impl Into<String>) -> Self {
        self.alignment = alignment.into();
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.resources.insert(name.into(), amount);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgency_follows_cadence() {
        let mut thread = Thread::new("thr_grain", "The grain shortage").with_cadence(2);
        assert!(!thread.is_urgent());

        thread.episodes_since_progress = 2;
        assert!(thread.is_urgent());

        thread.mark_progress();
        assert!(!thread.is_urgent());
    }

    #[test]
    fn test_resolved_thread_never_urgent() {
        let mut thread = Thread::new("thr_trial", "The trial of Milo").with_cadence(0);
        assert!(thread.is_urgent());

        thread.resolve();
        assert!(!thread.is_urgent());
    }

    #[test]
    fn test_default_cadence() {
        let thread: Thread = serde_json::from_str(r#"{"id": "t"}"#).unwrap();
        assert_eq!(thread.max_episodes_without_progress, 3);
        assert!(thread.is_open());
    }
}
