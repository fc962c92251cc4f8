//! Property tests for the world state engine.
//!
//! These tests use `proptest` to generate random graphs, ledgers and delta
//! batches and verify that the engine's invariants hold for each.

use proptest::prelude::*;
use state_engine::*;
use world_model::{Character, EntityGraph, Relationship, Value};

const IDS: [&str; 8] = ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"];

fn senate() -> EntityGraph {
    EntityGraph::new()
        .with_character(
            Character::new("char_varo", "Varo")
                .with_stat("wealth", 80.0)
                .with_belief("The consul is weak", 0.5),
        )
        .with_character(Character::new("char_quintus", "Quintus").with_stat("wealth", 30.0))
}

fn edge_strategy() -> impl Strategy<Value = Relationship> {
    (0..IDS.len(), 0..IDS.len(), 0.0..100.0f64).prop_map(|(from, to, trust)| {
        Relationship::new(IDS[from], IDS[to], "ally").with_weight("trust", trust)
    })
}

fn cmp_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("=="), Just("!="), Just(">"), Just("<"), Just(">="), Just("<=")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Reading, setting, then reading a resolved path yields the written value.
    #[test]
    fn set_then_read_roundtrips(wealth in -1.0e6..1.0e6f64, claim in "[a-z ]{1,24}") {
        let mut graph = senate();

        let wealth_path = "characters.char_varo.stats.wealth";
        prop_assert!(read(&graph, wealth_path).is_ok());
        apply(&mut graph, &Delta::set(wealth_path, wealth)).unwrap();
        prop_assert_eq!(read(&graph, wealth_path).unwrap(), Value::Number(wealth));

        let claim_path = "characters.char_varo.beliefs[0].claim";
        apply(&mut graph, &Delta::set(claim_path, claim.as_str())).unwrap();
        prop_assert_eq!(read(&graph, claim_path).unwrap(), Value::Text(claim));
    }

    /// A successful transfer conserves the pair's total; an overdraft is
    /// rejected and changes nothing.
    #[test]
    fn transfer_conserves_or_rejects(
        from_balance in 0..10_000u64,
        to_balance in 0..10_000u64,
        amount in 1..20_000u64,
    ) {
        let mut graph = EntityGraph::new()
            .with_balance("char_varo", from_balance)
            .with_balance("char_quintus", to_balance);
        let before = graph.assets.clone();

        let outcome = apply(&mut graph, &Delta::transfer("char_varo", "char_quintus", amount));
        let from_after = graph.assets.balance("char_varo").unwrap();
        let to_after = graph.assets.balance("char_quintus").unwrap();

        if amount <= from_balance {
            prop_assert!(outcome.is_ok());
            prop_assert_eq!(from_after + to_after, from_balance + to_balance);
            prop_assert_eq!(from_after, from_balance - amount);
        } else {
            prop_assert_eq!(outcome.unwrap_err().code(), "InsufficientFunds");
            prop_assert_eq!(graph.assets, before);
        }
    }

    /// Absolute paths pass through shorthand expansion untouched, and
    /// expanding twice is the same as expanding once.
    #[test]
    fn shorthand_expansion_is_idempotent(
        id in "char_[a-z]{1,8}",
        stat in "[a-z]{1,10}",
        role in prop_oneof![Just("actor"), Just("target"), Just("relationship")],
    ) {
        let bindings = RoleBindings::new()
            .with_actor(id.clone())
            .with_target("char_target")
            .with_relationship("rel_char_a_char_b");

        for absolute in [
            format!("characters.{}.stats.{}", id, stat),
            format!("world.stats.{}", stat),
            format!("assets.cash_ledger.{}.denarii", id),
            format!("relationships.edges.rel_x.weights.{}", stat),
        ] {
            prop_assert_eq!(expand_shorthand(&absolute, &bindings).unwrap(), absolute);
        }

        let shorthand = format!("{}.stats.{}", role, stat);
        let once = expand_shorthand(&shorthand, &bindings).unwrap();
        let twice = expand_shorthand(&once, &bindings).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// The same expression against the same context gives the same result.
    #[test]
    fn evaluation_is_deterministic(
        wealth in 0.0..200.0f64,
        threshold in 0.0..200.0f64,
        op in cmp_strategy(),
        bind_target in any::<bool>(),
    ) {
        let mut graph = senate();
        graph.character_mut("char_varo").unwrap().stats.insert("wealth".into(), wealth);

        let mut bindings = RoleBindings::new().with_actor("char_varo");
        if bind_target {
            bindings = bindings.with_target("char_quintus");
        }
        let ctx = EvalContext::from_bindings(&graph, &bindings);

        for source in [
            format!("actor.stats.wealth {} {}", op, threshold),
            format!("actor.stats.wealth - target.stats.wealth {} {}", op, threshold),
        ] {
            let first = evaluate(&source, &ctx);
            let second = evaluate(&source, &ctx);
            prop_assert_eq!(first, second);
        }
    }

    /// One failing delta never blocks the valid deltas around it.
    #[test]
    fn batch_applies_around_failure(
        amounts in prop::collection::vec(1..100i64, 1..12),
        failure_at in any::<prop::sample::Index>(),
    ) {
        let mut graph = senate();
        let mut deltas: Vec<Delta> = amounts
            .iter()
            .map(|n| Delta::add("characters.char_quintus.stats.wealth", *n))
            .collect();
        let position = failure_at.index(deltas.len() + 1);
        deltas.insert(position, Delta::add("characters.char_quintus.name", 1));

        let report = apply_batch(&mut graph, &deltas);

        prop_assert_eq!(report.applied.len(), amounts.len());
        prop_assert_eq!(report.failures.len(), 1);
        prop_assert_eq!(report.failures[0].index, position);
        prop_assert_eq!(report.failures[0].code(), "TypeMismatch");

        let expected = 30.0 + amounts.iter().sum::<i64>() as f64;
        prop_assert_eq!(
            read(&graph, "characters.char_quintus.stats.wealth").unwrap(),
            Value::Number(expected)
        );
    }

    /// Every returned edge lies within k hops and the count respects the limit.
    #[test]
    fn retrieval_is_bounded(
        edges in prop::collection::vec(edge_strategy(), 0..24),
        seeds in prop::collection::vec(0..IDS.len(), 1..3),
        k in 0..4usize,
        max_relationships in 1..10usize,
    ) {
        let mut graph = EntityGraph::new();
        for edge in edges {
            graph = graph.with_relationship(edge);
        }
        let seeds: Vec<&str> = seeds.into_iter().map(|i| IDS[i]).collect();

        let retriever = Retriever::with_limits(RetrievalConfig {
            k,
            max_relationships,
            ..RetrievalConfig::default()
        });
        let hood = retriever.retrieve(&graph, &seeds);

        prop_assert!(hood.relationships.len() <= max_relationships);
        for edge in &hood.relationships {
            prop_assert!(edge.hop >= 1 && edge.hop <= k);
        }
        for pair in hood.relationships.windows(2) {
            prop_assert!(pair[0].hop <= pair[1].hop);
        }
    }
}
