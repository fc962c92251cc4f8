//! The entity graph - the central structure holding all world data.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::entities::{Assets, Character, Faction, Relationship, RelationshipGraph, Secret, Thread};
use crate::value::{addressable, keyword, SlotRef, Slot, Value};

/// World time tracking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldTime {
    /// Episodes played so far.
    #[serde(default)]
    pub episode: u64,
    #[serde(default)]
    pub day: u64,
    #[serde(default)]
    pub season: Season,
}

addressable!(WorldTime {
    "episode" => episode: Count,
    "day" => day: Count,
    "season" => season: Keyword,
});

impl WorldTime {
    pub fn new(episode: u64, day: u64, season: Season) -> Self {
        Self {
            episode,
            day,
            season,
        }
    }
}

/// Seasons of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

keyword!(Season {
    Spring => "spring",
    Summer => "summer",
    Autumn => "autumn",
    Winter => "winter",
});

impl Season {
    /// Season for a day of the year; every season lasts 90 days.
    pub fn for_day(day: u64) -> Self {
        match day % 360 {
            0..=89 => Season::Spring,
            90..=179 => Season::Summer,
            180..=269 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

/// A place in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub connected_locations: BTreeSet<String>,
    /// Free-form atmosphere tags.
    #[serde(default)]
    pub ambient_tags: Vec<String>,
}

addressable!(Location, key = id {
    "id" => id: Text,
    "name" => name: Text,
    "description" => description: Text,
    "connected_locations" => connected_locations: Ids,
    "ambient_tags" => ambient_tags: Texts,
});

/// World-level state: global stats, places and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct World {
    /// Global numeric stats (unrest, grain_supply, ...).
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub time: WorldTime,
}

addressable!(World {
    "stats" => stats: Numbers,
    "locations" => locations: Records,
    "time" => time: Record,
});

/// Top-level sections of the entity graph, addressed by the first path
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    World,
    Characters,
    Relationships,
    Assets,
    Secrets,
    Threads,
    Factions,
    Constraints,
}

impl Root {
    pub const ALL: [Root; 8] = [
        Root::World,
        Root::Characters,
        Root::Relationships,
        Root::Assets,
        Root::Secrets,
        Root::Threads,
        Root::Factions,
        Root::Constraints,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|root| root.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Root::World => "world",
            Root::Characters => "characters",
            Root::Relationships => "relationships",
            Root::Assets => "assets",
            Root::Secrets => "secrets",
            Root::Threads => "threads",
            Root::Factions => "factions",
            Root::Constraints => "constraints",
        }
    }

    /// Whether the segment after this root may be an entity id.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Root::Characters | Root::Relationships | Root::Secrets | Root::Threads | Root::Factions
        )
    }
}

impl std::fmt::Display for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete state of the world at any point in time.
///
/// Owned by the caller; engine operations borrow it for the duration of a
/// single call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGraph {
    #[serde(default)]
    pub world: World,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub relationships: RelationshipGraph,
    #[serde(default)]
    pub assets: Assets,
    #[serde(default)]
    pub secrets: Vec<Secret>,
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub factions: Vec<Faction>,
    /// Free-form caller rules.
    #[serde(default = "empty_constraints")]
    pub constraints: Value,
}

fn empty_constraints() -> Value {
    Value::Map(BTreeMap::new())
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self {
            world: World::default(),
            characters: Vec::new(),
            relationships: RelationshipGraph::default(),
            assets: Assets::default(),
            secrets: Vec::new(),
            threads: Vec::new(),
            factions: Vec::new(),
            constraints: empty_constraints(),
        }
    }
}

impl EntityGraph {
    /// Create a new empty entity graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_character(mut self, character: Character) -> Self {
        self.characters.push(character);
        self
    }

    pub fn with_relationship(mut self, edge: Relationship) -> Self {
        self.relationships.add_edge(edge);
        self
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secrets.push(secret);
        self
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.threads.push(thread);
        self
    }

    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.factions.push(faction);
        self
    }

    pub fn with_balance(mut self, holder: &str, denarii: u64) -> Self {
        self.assets.set_balance(holder, denarii);
        self
    }

    /// Shared handle to a root section.
    pub fn root(&self, root: Root) -> SlotRef<'_> {
        match root {
            Root::World => SlotRef::Record(&self.world),
            Root::Characters => SlotRef::Records(&self.characters),
            Root::Relationships => SlotRef::Record(&self.relationships),
            Root::Assets => SlotRef::Record(&self.assets),
            Root::Secrets => SlotRef::Records(&self.secrets),
            Root::Threads => SlotRef::Records(&self.threads),
            Root::Factions => SlotRef::Records(&self.factions),
            Root::Constraints => SlotRef::Value(&self.constraints),
        }
    }

    /// Mutable handle to a root section.
    pub fn root_mut(&mut self, root: Root) -> Slot<'_> {
        match root {
            Root::World => Slot::Record(&mut self.world),
            Root::Characters => Slot::Records(&mut self.characters),
            Root::Relationships => Slot::Record(&mut self.relationships),
            Root::Assets => Slot::Record(&mut self.assets),
            Root::Secrets => Slot::Records(&mut self.secrets),
            Root::Threads => Slot::Records(&mut self.threads),
            Root::Factions => Slot::Records(&mut self.factions),
            Root::Constraints => Slot::Value(&mut self.constraints),
        }
    }

    /// Get character by ID.
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Get mutable character by ID.
    pub fn character_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.get(id)
    }

    pub fn secret(&self, id: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.id == id)
    }

    pub fn thread(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    pub fn faction(&self, id: &str) -> Option<&Faction> {
        self.factions.iter().find(|f| f.id == id)
    }

    /// Ids of every principal character, in stored order.
    pub fn principals(&self, threshold: f64) -> Vec<&str> {
        self.characters
            .iter()
            .filter(|c| c.is_principal(threshold))
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Close out an episode.
    ///
    /// Bumps the episode counter and the stall counter of every open thread,
    /// then returns the ids of threads that are now urgent.
    pub fn advance_episode(&mut self) -> Vec<String> {
        self.world.time.episode += 1;
        for thread in self.threads.iter_mut().filter(|t| t.is_open()) {
            thread.episodes_since_progress += 1;
        }
        self.threads
            .iter()
            .filter(|t| t.is_urgent())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Advance the calendar, updating the season.
    pub fn advance_days(&mut self, days: u64) {
        self.world.time.day += days;
        self.world.time.season = Season::for_day(self.world.time.day);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Step;

    #[test]
    fn test_root_names_roundtrip() {
        for root in Root::ALL {
            assert_eq!(Root::parse(root.as_str()), Some(root));
        }
        assert_eq!(Root::parse("inventory"), None);
        assert!(Root::Characters.is_collection());
        assert!(!Root::Assets.is_collection());
    }

    #[test]
    fn test_add_character() {
        let graph = EntityGraph::new().with_character(Character::new("char_varo", "Varo"));

        assert!(graph.character("char_varo").is_some());
        assert_eq!(graph.character("char_varo").unwrap().name, "Varo");
        assert!(graph.character("char_tiro").is_none());
    }

    #[test]
    fn test_root_handles_reach_entities() {
        let graph = EntityGraph::new()
            .with_character(Character::new("char_varo", "Varo").with_stat("wealth", 80.0));

        let wealth = graph
            .root(Root::Characters)
            .step(Step::Field("char_varo"))
            .and_then(|c| c.step(Step::Field("stats")))
            .and_then(|s| s.step(Step::Field("wealth")))
            .and_then(|w| w.number());
        assert_eq!(wealth, Some(80.0));
    }

    #[test]
    fn test_advance_episode_reports_urgent_threads() {
        let mut graph = EntityGraph::new()
            .with_thread(Thread::new("thr_grain", "Grain").with_cadence(2))
            .with_thread(Thread::new("thr_trial", "Trial").with_cadence(5));

        assert!(graph.advance_episode().is_empty());
        assert_eq!(graph.advance_episode(), vec!["thr_grain".to_string()]);
        assert_eq!(graph.world.time.episode, 2);

        graph.thread_mut("thr_grain").unwrap().mark_progress();
        assert!(graph.advance_episode().is_empty());
    }

    #[test]
    fn test_resolved_threads_do_not_stall() {
        let mut graph = EntityGraph::new().with_thread(Thread::new("thr_old", "Old"));
        graph.thread_mut("thr_old").unwrap().resolve();

        graph.advance_episode();
        assert_eq!(graph.thread("thr_old").unwrap().episodes_since_progress, 0);
    }

    #[test]
    fn test_advance_days_changes_season() {
        let mut graph = EntityGraph::new();
        graph.advance_days(89);
        assert_eq!(graph.world.time.season, Season::Spring);

        graph.advance_days(1);
        assert_eq!(graph.world.time.season, Season::Summer);
    }

    #[test]
    fn test_deserialize_partial_document() {
        let graph: EntityGraph = serde_json::from_str(
            r#"{
                "characters": [{"id": "char_varo", "name": "Varo"}],
                "assets": {"cash_ledger": [{"holder": "char_varo", "denarii": 100}]}
            }"#,
        )
        .unwrap();

        assert_eq!(graph.assets.balance("char_varo"), Some(100));
        assert!(graph.constraints.as_map().is_some());
        assert!(graph.secrets.is_empty());
    }
}
