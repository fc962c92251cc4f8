//! Relationship edges between characters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::addressable;

/// A directed relationship from one character to another.
///
/// Both directions of a pair may exist independently, each with its own
/// weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub from: String,
    pub to: String,

    /// Relationship type tag (e.g. "patron", "rival", "spouse").
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Numeric weights such as trust, fear, loyalty (0-100).
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,

    /// Boolean markers such as public_feud or transactional.
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

addressable!(Relationship, key = id {
    "id" => id: Text,
    "from" => from: Text,
    "to" => to: Text,
    "type" => kind: Text,
    "weights" => weights: Numbers,
    "flags" => flags: Flags,
});

impl Relationship {
    /// Create an edge; the id is derived from the endpoints.
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        Self {
            id: format!("rel_{}_{}", from, to),
            from,
            to,
            kind: kind.into(),
            weights: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_weight(mut self, name: impl Into<String>, value: f64) -> Self {
        self.weights.insert(name.into(), value);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>) -> Self {
        self.flags.insert(name.into(), true);
        self
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Directional key `from->to`, unique per ordered pair.
    pub fn edge_key(&self) -> String {
        format!("{}->{}", self.from, self.to)
    }

    /// Largest weight on the edge, 0.0 when there are none.
    pub fn max_weight(&self) -> f64 {
        self.weights.values().copied().fold(0.0, f64::max)
    }

    pub fn touches(&self, character_id: &str) -> bool {
        self.from == character_id || self.to == character_id
    }

    /// The endpoint opposite `character_id`, if the edge touches it.
    pub fn other_end(&self, character_id: &str) -> Option<&str> {
        if self.from == character_id {
            Some(self.to.as_str())
        } else if self.to == character_id {
            Some(self.from.as_str())
        } else {
            None
        }
    }
}

/// All relationship edges in the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipGraph {
    #[serde(default)]
    pub edges: Vec<Relationship>,
}

addressable!(RelationshipGraph {
    "edges" => edges: Records,
});

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: Relationship) {
        self.edges.push(edge);
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Relationship> {
        self.edges.iter_mut().find(|e| e.id == id)
    }

    /// The directed edge `from -> to`, if present.
    pub fn between(&self, from: &str, to: &str) -> Option<&Relationship> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    /// Edges touching a character in either direction, in stored order.
    pub fn touching<'a>(&'a self, character_id: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.edges.iter().filter(move |e| e.touches(character_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_and_id() {
        let edge = Relationship::new("char_varo", "char_quintus", "patron");
        assert_eq!(edge.id, "rel_char_varo_char_quintus");
        assert_eq!(edge.edge_key(), "char_varo->char_quintus");
    }

    #[test]
    fn test_max_weight() {
        let edge = Relationship::new("a", "b", "ally")
            .with_weight("trust", 40.0)
            .with_weight("loyalty", 85.0);
        assert_eq!(edge.max_weight(), 85.0);
        assert_eq!(Relationship::new("a", "b", "ally").max_weight(), 0.0);
    }

    #[test]
    fn test_other_end() {
        let edge = Relationship::new("a", "b", "rival");
        assert_eq!(edge.other_end("a"), Some("b"));
        assert_eq!(edge.other_end("b"), Some("a"));
        assert_eq!(edge.other_end("c"), None);
    }

    #[test]
    fn test_touching_is_undirected() {
        let mut graph = RelationshipGraph::new();
        graph.add_edge(Relationship::new("a", "b", "ally"));
        graph.add_edge(Relationship::new("c", "a", "debtor"));
        graph.add_edge(Relationship::new("b", "c", "rival"));

        let ids: Vec<_> = graph.touching("a").map(|e| e.edge_key()).collect();
        assert_eq!(ids, vec!["a->b", "c->a"]);
        assert!(graph.between("c", "a").is_some());
        assert!(graph.between("a", "c").is_none());
    }

    #[test]
    fn test_type_field_name() {
        let edge: Relationship = serde_json::from_str(
            r#"{"id": "r1", "from": "a", "to": "b", "type": "patron", "weights": {"trust": 60}}"#,
        )
        .unwrap();
        assert_eq!(edge.kind, "patron");
        assert_eq!(edge.weight("trust"), Some(60.0));
    }
}
