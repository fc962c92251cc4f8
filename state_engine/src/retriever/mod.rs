//! Retriever - bounded k-hop neighborhoods of the relationship graph.
//!
//! Retrieval works as follows:
//! 1. **Traversal**: Breadth-first from the seed characters, following edges
//!    in both directions, up to `k` hops
//! 2. **Ranking**: Edges sorted by hop, then by strongest weight
//! 3. **Truncation**: Keep at most `max_relationships` edges
//! 4. **Participants**: Seeds plus the endpoints of the kept edges
//! 5. **Assembly**: Secrets, beliefs, assets and threads touching the
//!    participants, each bounded by its own limit

mod dynamics;

pub use dynamics::*;

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;
use world_model::{AssetKind, Belief, EntityGraph, Keyword, Relationship, Secret, Thread, WorldTime};

use crate::config::{EngineConfig, RetrievalConfig};

/// A relationship edge reached during traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborhoodEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,

    /// Hops from the nearest seed (1 for edges touching a seed).
    pub hop: usize,

    /// Largest weight on the edge, used for ranking.
    pub strength: f64,

    pub dynamic: String,
}

impl NeighborhoodEdge {
    fn reached(edge: &Relationship, hop: usize) -> Self {
        Self {
            id: edge.id.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            kind: edge.kind.clone(),
            hop,
            strength: edge.max_weight(),
            dynamic: describe_dynamic(edge),
        }
    }
}

/// The strongest beliefs of one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterBeliefs {
    pub character_id: String,
    pub name: String,
    pub beliefs: Vec<Belief>,
}

/// An asset touching the participants, with a one-line description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetContext {
    pub kind: AssetKind,
    pub id: String,
    pub context: String,
}

/// The bounded slice of the world around a set of seed characters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighborhood {
    pub seeds: Vec<String>,
    pub time: WorldTime,
    pub relationships: Vec<NeighborhoodEdge>,

    /// Seeds then edge endpoints, in first-seen order.
    pub participants: Vec<String>,

    pub secrets: Vec<Secret>,
    pub beliefs: Vec<CharacterBeliefs>,
    pub assets: Vec<AssetContext>,

    /// Open threads, urgent first.
    pub threads: Vec<Thread>,

    pub principals: Vec<String>,
}

impl Neighborhood {
    /// Format the neighborhood as a plain-text context block.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("## World State\n");
        prompt.push_str(&format!(
            "Episode {}, day {} ({})\n\n",
            self.time.episode,
            self.time.day,
            self.time.season.as_str()
        ));

        if !self.principals.is_empty() {
            prompt.push_str("## Principals\n");
            prompt.push_str(&self.principals.join(", "));
            prompt.push_str("\n\n");
        }

        if !self.relationships.is_empty() {
            prompt.push_str("## Relationships\n");
            for edge in &self.relationships {
                prompt.push_str(&format!(
                    "- {} -> {} ({}): {} [hop {}]\n",
                    edge.from, edge.to, edge.kind, edge.dynamic, edge.hop
                ));
            }
            prompt.push('\n');
        }

        if !self.secrets.is_empty() {
            prompt.push_str("## Secrets\n");
            for secret in &self.secrets {
                prompt.push_str(&format!(
                    "- {} (severity {})\n",
                    secret.description,
                    secret.severity()
                ));
            }
            prompt.push('\n');
        }

        if !self.beliefs.is_empty() {
            prompt.push_str("## Beliefs\n");
            for entry in &self.beliefs {
                let claims: Vec<_> = entry
                    .beliefs
                    .iter()
                    .map(|b| format!("{} ({:.2})", b.claim, b.confidence))
                    .collect();
                prompt.push_str(&format!("- {}: {}\n", entry.name, claims.join("; ")));
            }
            prompt.push('\n');
        }

        if !self.assets.is_empty() {
            prompt.push_str("## Assets\n");
            for asset in &self.assets {
                prompt.push_str(&format!("- {}\n", asset.context));
            }
            prompt.push('\n');
        }

        if !self.threads.is_empty() {
            prompt.push_str("## Open Threads\n");
            for thread in &self.threads {
                prompt.push_str(&format!(
                    "- {}{} (priority {})\n",
                    thread.title,
                    if thread.is_urgent() { " [URGENT]" } else { "" },
                    thread.priority
                ));
            }
            prompt.push('\n');
        }

        prompt
    }
}

/// Builds neighborhoods from an entity graph.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: EngineConfig,
}

impl Retriever {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Create a retriever with default limits.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Retriever using the given limits and the default principal threshold.
    pub fn with_limits(retrieval: RetrievalConfig) -> Self {
        Self::new(EngineConfig {
            retrieval,
            ..EngineConfig::default()
        })
    }

    pub fn limits(&self) -> &RetrievalConfig {
        &self.config.retrieval
    }

    /// Breadth-first walk from the seeds.
    ///
    /// Each edge is recorded once, keyed by `from->to`, at the hop where it
    /// is first reached. The result is ranked and truncated.
    pub fn traverse<S: AsRef<str>>(&self, graph: &EntityGraph, seeds: &[S]) -> Vec<NeighborhoodEdge> {
        let limits = self.limits();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut recorded: HashSet<String> = HashSet::new();
        let mut reached = Vec::new();

        let mut queue = VecDeque::new();
        for seed in seeds {
            let seed = seed.as_ref();
            if visited.insert(seed) {
                queue.push_back((seed, 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= limits.k {
                continue;
            }
            for edge in graph.relationships.touching(id) {
                if !recorded.insert(edge.edge_key()) {
                    continue;
                }
                reached.push(NeighborhoodEdge::reached(edge, depth + 1));

                if let Some(far) = edge.other_end(id) {
                    if visited.insert(far) {
                        queue.push_back((far, depth + 1));
                    }
                }
            }
        }

        // Stable sort keeps traversal order among equals.
        reached.sort_by(|a, b| {
            a.hop.cmp(&b.hop).then_with(|| {
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        reached.truncate(limits.max_relationships);
        reached
    }

    /// Assemble the full neighborhood around `seeds`.
    pub fn retrieve<S: AsRef<str>>(&self, graph: &EntityGraph, seeds: &[S]) -> Neighborhood {
        let limits = self.limits();
        let relationships = self.traverse(graph, seeds);

        let mut participants: Vec<String> = Vec::new();
        let mut participant_set: BTreeSet<String> = BTreeSet::new();
        let endpoints = relationships
            .iter()
            .flat_map(|e| [e.from.as_str(), e.to.as_str()]);
        for id in seeds.iter().map(|s| s.as_ref()).chain(endpoints) {
            if participant_set.insert(id.to_string()) {
                participants.push(id.to_string());
            }
        }

        let secrets = self.relevant_secrets(graph, &participant_set);

        let beliefs: Vec<CharacterBeliefs> = participants
            .iter()
            .filter_map(|id| graph.character(id))
            .map(|c| CharacterBeliefs {
                character_id: c.id.clone(),
                name: c.name.clone(),
                beliefs: c
                    .strongest_beliefs(limits.max_beliefs_per_character)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .filter(|entry| !entry.beliefs.is_empty())
            .collect();

        let assets = relevant_assets(graph, &participant_set);
        let threads = self.open_threads(graph, &participant_set);

        let principals: Vec<String> = participants
            .iter()
            .filter(|id| {
                graph
                    .character(id)
                    .is_some_and(|c| c.is_principal(self.config.principal_threshold))
            })
            .cloned()
            .collect();

        debug!(
            seeds = seeds.len(),
            k = limits.k,
            relationships = relationships.len(),
            participants = participants.len(),
            secrets = secrets.len(),
            assets = assets.len(),
            threads = threads.len(),
            "neighborhood retrieved"
        );

        Neighborhood {
            seeds: seeds.iter().map(|s| s.as_ref().to_string()).collect(),
            time: graph.world.time,
            relationships,
            participants,
            secrets,
            beliefs,
            assets,
            threads,
            principals,
        }
    }

    fn relevant_secrets(&self, graph: &EntityGraph, participants: &BTreeSet<String>) -> Vec<Secret> {
        let limits = self.limits();
        let mut secrets: Vec<&Secret> = graph
            .secrets
            .iter()
            .filter(|s| limits.include_inactive_secrets || s.is_active())
            .filter(|s| s.involves_any(participants))
            .collect();

        secrets.sort_by(|a, b| {
            b.severity()
                .partial_cmp(&a.severity())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        secrets.truncate(limits.max_secrets);
        secrets.into_iter().cloned().collect()
    }

    fn open_threads(&self, graph: &EntityGraph, participants: &BTreeSet<String>) -> Vec<Thread> {
        let mut threads: Vec<&Thread> = graph
            .threads
            .iter()
            .filter(|t| t.is_open())
            .filter(|t| t.participants.iter().any(|p| participants.contains(p)))
            .collect();

        threads.sort_by(|a, b| {
            b.is_urgent()
                .cmp(&a.is_urgent())
                .then_with(|| b.priority.cmp(&a.priority))
        });
        threads.truncate(self.limits().max_threads);
        threads.into_iter().cloned().collect()
    }
}

fn relevant_assets(graph: &EntityGraph, participants: &BTreeSet<String>) -> Vec<AssetContext> {
    let assets = &graph.assets;
    let networks = assets
        .networks
        .iter()
        .filter(|n| n.involves_any(participants))
        .map(|n| AssetContext {
            kind: AssetKind::Network,
            id: n.id.clone(),
            context: n.describe(),
        });
    let offices = assets
        .offices
        .iter()
        .filter(|o| o.involves_any(participants))
        .map(|o| AssetContext {
            kind: AssetKind::Office,
            id: o.id.clone(),
            context: o.describe(),
        });
    let contracts = assets
        .contracts
        .iter()
        .filter(|c| c.involves_any(participants))
        .map(|c| AssetContext {
            kind: AssetKind::Contract,
            id: c.id.clone(),
            context: c.describe(),
        });

    networks.chain(offices).chain(contracts).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::{Character, Contract, Network, Office, SecretStatus};

    fn chain() -> EntityGraph {
        EntityGraph::new()
            .with_character(Character::new("a", "Aulus"))
            .with_character(Character::new("b", "Balbus"))
            .with_character(Character::new("c", "Cato"))
            .with_relationship(Relationship::new("a", "b", "ally").with_weight("trust", 50.0))
            .with_relationship(Relationship::new("b", "c", "rival").with_weight("rivalry", 90.0))
    }

    fn limits(k: usize) -> RetrievalConfig {
        RetrievalConfig {
            k,
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn test_chain_two_hops() {
        let edges = Retriever::with_defaults().traverse(&chain(), &["a"]);

        let reached: Vec<_> = edges.iter().map(|e| (e.from.as_str(), e.to.as_str(), e.hop)).collect();
        assert_eq!(reached, [("a", "b", 1), ("b", "c", 2)]);
        assert_eq!(edges[1].dynamic, "rivalry");
        assert_eq!(edges[0].dynamic, "ally");
    }

    #[test]
    fn test_hop_limit() {
        let edges = Retriever::with_limits(limits(1)).traverse(&chain(), &["a"]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, "b");

        let none = Retriever::with_limits(limits(0)).traverse(&chain(), &["a"]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_edges_followed_in_both_directions() {
        let edges = Retriever::with_limits(limits(1)).traverse(&chain(), &["c"]);
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].from.as_str(), edges[0].to.as_str()), ("b", "c"));
    }

    #[test]
    fn test_reverse_edge_recorded_separately() {
        let graph = chain().with_relationship(Relationship::new("b", "a", "client"));
        let edges = Retriever::with_limits(limits(1)).traverse(&graph, &["a"]);
        let keys: Vec<_> = edges.iter().map(|e| format!("{}->{}", e.from, e.to)).collect();
        assert_eq!(keys, ["a->b", "b->a"]);
    }

    #[test]
    fn test_strength_orders_within_hop_and_truncates() {
        let graph = EntityGraph::new()
            .with_relationship(Relationship::new("a", "x", "ally").with_weight("trust", 10.0))
            .with_relationship(Relationship::new("a", "y", "ally").with_weight("trust", 90.0))
            .with_relationship(Relationship::new("a", "z", "ally").with_weight("trust", 90.0))
            .with_relationship(Relationship::new("y", "w", "ally").with_weight("trust", 99.0));

        let edges = Retriever::with_defaults().traverse(&graph, &["a"]);
        let order: Vec<_> = edges.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(order, ["y", "z", "x", "w"]);

        let retriever = Retriever::with_limits(RetrievalConfig {
            max_relationships: 2,
            ..RetrievalConfig::default()
        });
        let order: Vec<_> = retriever.traverse(&graph, &["a"]).into_iter().map(|e| e.to).collect();
        assert_eq!(order, ["y", "z"]);
    }

    #[test]
    fn test_participants_first_seen() {
        let hood = Retriever::with_defaults().retrieve(&chain(), &["b"]);
        assert_eq!(hood.participants, ["b", "a", "c"]);
    }

    #[test]
    fn test_secrets_filtered_and_ranked() {
        let graph = chain()
            .with_secret(
                world_model::Secret::new("s_low", "Owes a debt")
                    .with_holder("a")
                    .with_impact(5.0, 5.0),
            )
            .with_secret(
                world_model::Secret::new("s_high", "Poisoned a rival")
                    .with_subject("c")
                    .with_impact(40.0, 50.0),
            )
            .with_secret(
                world_model::Secret::new("s_spent", "Old scandal")
                    .with_subject("a")
                    .with_impact(100.0, 100.0)
                    .with_status(SecretStatus::Inactive),
            )
            .with_secret(
                world_model::Secret::new("s_far", "Unrelated")
                    .with_subject("zed")
                    .with_impact(100.0, 100.0),
            );

        let hood = Retriever::with_defaults().retrieve(&graph, &["a"]);
        let ids: Vec<_> = hood.secrets.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s_high", "s_low"]);

        let retriever = Retriever::with_limits(RetrievalConfig {
            include_inactive_secrets: true,
            max_secrets: 2,
            ..RetrievalConfig::default()
        });
        let ids: Vec<_> = retriever
            .retrieve(&graph, &["a"])
            .secrets
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, ["s_spent", "s_high"]);
    }

    #[test]
    fn test_beliefs_per_participant() {
        let mut graph = chain();
        if let Some(aulus) = graph.character_mut("a") {
            aulus.beliefs = vec![
                Belief::new("Cato is dangerous", 0.4),
                Belief::new("Balbus is loyal", 0.9),
                Belief::new("Rome is decaying", 0.7),
            ];
        }

        let retriever = Retriever::with_limits(RetrievalConfig {
            max_beliefs_per_character: 2,
            ..RetrievalConfig::default()
        });
        let hood = retriever.retrieve(&graph, &["a"]);

        assert_eq!(hood.beliefs.len(), 1);
        let claims: Vec<_> = hood.beliefs[0].beliefs.iter().map(|b| b.claim.as_str()).collect();
        assert_eq!(claims, ["Balbus is loyal", "Rome is decaying"]);
    }

    #[test]
    fn test_assets_touching_participants() {
        let mut graph = chain();
        graph.assets.networks.push(Network {
            id: "net_clients".into(),
            name: "Clientela".into(),
            owner: "a".into(),
            members: BTreeSet::new(),
            strength: 40.0,
        });
        graph.assets.offices.push(Office {
            id: "off_praetor".into(),
            title: "Praetor".into(),
            holder: None,
            stakeholders: ["c".to_string()].into(),
        });
        graph.assets.contracts.push(Contract {
            id: "con_grain".into(),
            description: "Grain supply".into(),
            parties: ["zed".to_string()].into(),
            value: 1000.0,
        });

        let hood = Retriever::with_defaults().retrieve(&graph, &["a"]);
        let ids: Vec<_> = hood.assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["net_clients", "off_praetor"]);
        assert_eq!(hood.assets[1].context, "Praetor (vacant)");
    }

    #[test]
    fn test_threads_urgent_first() {
        let mut stalled = Thread::new("t_stalled", "The debt").with_priority(1).with_participant("c");
        stalled.episodes_since_progress = 5;
        let mut closed = Thread::new("t_done", "Finished").with_priority(9).with_participant("a");
        closed.resolve();

        let graph = chain()
            .with_thread(Thread::new("t_low", "Gossip").with_priority(2).with_participant("a"))
            .with_thread(Thread::new("t_high", "Election").with_priority(8).with_participant("b"))
            .with_thread(stalled)
            .with_thread(closed);

        let hood = Retriever::with_defaults().retrieve(&graph, &["a"]);
        let ids: Vec<_> = hood.threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t_stalled", "t_high", "t_low"]);
    }

    #[test]
    fn test_principals_and_prompt() {
        let graph = chain()
            .with_character(Character::new("p", "Pompeius").with_stat("auctoritas", 90.0))
            .with_relationship(Relationship::new("p", "a", "patron").with_weight("loyalty", 80.0));

        let hood = Retriever::with_defaults().retrieve(&graph, &["a"]);
        assert_eq!(hood.principals, ["p"]);

        let prompt = hood.to_prompt_string();
        assert!(prompt.contains("## Principals\np"));
        assert!(prompt.contains("- p -> a (patron): strong loyalty [hop 1]"));
        assert!(prompt.contains("Episode 0, day 0 (spring)"));
    }

    #[test]
    fn test_unknown_seed_is_still_a_participant() {
        let hood = Retriever::with_defaults().retrieve(&chain(), &["nobody"]);
        assert!(hood.relationships.is_empty());
        assert_eq!(hood.participants, ["nobody"]);
        assert!(hood.beliefs.is_empty());
    }
}
