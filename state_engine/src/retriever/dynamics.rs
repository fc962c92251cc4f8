//! Human-readable labels for relationship edges.

use world_model::Relationship;

/// Weight thresholds, checked in order. A label fires when the weight is
/// above (or for `distrust`, below) its threshold.
const WEIGHT_RULES: [(&str, Threshold, &str); 7] = [
    ("loyalty", Threshold::Above(70.0), "strong loyalty"),
    ("resentment", Threshold::Above(60.0), "bitter resentment"),
    ("trust", Threshold::Above(70.0), "deep trust"),
    ("trust", Threshold::Below(20.0), "distrust"),
    ("fear", Threshold::Above(60.0), "fear"),
    ("affection", Threshold::Above(70.0), "affection"),
    ("rivalry", Threshold::Above(60.0), "rivalry"),
];

const FLAG_RULES: [(&str, &str); 2] = [
    ("public_feud", "public feud"),
    ("transactional", "transactional"),
];

#[derive(Debug, Clone, Copy)]
enum Threshold {
    Above(f64),
    Below(f64),
}

impl Threshold {
    fn fires(self, value: f64) -> bool {
        match self {
            Threshold::Above(limit) => value > limit,
            Threshold::Below(limit) => value < limit,
        }
    }
}

/// Describe the dynamic of an edge, e.g. `"deep trust, transactional"`.
///
/// Falls back to the edge's type tag when nothing fires.
pub fn describe_dynamic(edge: &Relationship) -> String {
    let mut labels: Vec<&str> = WEIGHT_RULES
        .iter()
        .filter(|(weight, threshold, _)| edge.weight(weight).is_some_and(|v| threshold.fires(v)))
        .map(|(_, _, label)| *label)
        .collect();

    labels.extend(
        FLAG_RULES
            .iter()
            .filter(|(flag, _)| edge.has_flag(flag))
            .map(|(_, label)| *label),
    );

    if labels.is_empty() {
        edge.kind.clone()
    } else {
        labels.join(", ")
    }
}
