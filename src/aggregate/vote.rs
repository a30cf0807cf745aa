//! Weighted majority vote for classification.
use indexmap::IndexMap;

use crate::aggregate::{Aggregator, Estimate, NO_NEIGHBORS};
use crate::dataset::Value;
use crate::descriptor::Descriptors;
use crate::neighbors::Neighbor;

/// Similarity-weighted majority vote over the neighbors' measured
/// classes.
///
/// Every (neighbor, measurement) pair votes for its class with the
/// neighbor's similarity. Votes are normalized by the total similarity
/// and scaled by the largest similarity, so that a weak best match never
/// yields a confident probability.
#[derive(Debug, Clone)]
pub struct WeightedMajorityVote {
    accept_values: Vec<String>,
}

impl WeightedMajorityVote {
    /// `accept_values` are listed in the output probabilities even when
    /// no neighbor was measured with them.
    pub fn new(accept_values: Vec<String>) -> WeightedMajorityVote {
        WeightedMajorityVote { accept_values: accept_values }
    }
}

impl Aggregator for WeightedMajorityVote {
    fn aggregate(&self, neighbors: &[Neighbor], _query: &Descriptors) -> Estimate {
        weighted_majority_vote(neighbors, &self.accept_values)
    }
}

/// Weighted majority vote.
///
/// Ties between classes are broken in favor of the class encountered
/// first in `neighbors`.
pub fn weighted_majority_vote(neighbors: &[Neighbor], accept_values: &[String]) -> Estimate {
    let mut class_weights: IndexMap<&str, f64> = IndexMap::new();
    let mut total = 0.;
    let mut max_similarity = 0f64;

    for n in neighbors {
        for class in n.measurements.iter().filter_map(Value::as_str) {
            *class_weights.entry(class).or_insert(0.) += n.similarity;
            total += n.similarity;
            max_similarity = max_similarity.max(n.similarity);
        }
    }

    if class_weights.is_empty() {
        return Estimate::none(NO_NEIGHBORS);
    }
    if !(total > 0.) {
        return Estimate::none("Similar substances have zero similarity, cannot weight their votes.");
    }

    let mut probabilities = IndexMap::new();
    let mut best: Option<(&str, f64)> = None;
    for (&class, &w) in class_weights.iter() {
        let p = max_similarity * w / total;
        match best {
            Some((_, b)) if b >= p => {}
            _ => best = Some((class, p)),
        }
        probabilities.insert(class.to_string(), p);
    }
    for a in accept_values {
        probabilities.entry(a.clone()).or_insert(0.);
    }

    Estimate {
        value: best.map(|(class, _)| Value::Nominal(class.to_string())),
        probabilities: Some(probabilities),
        ..Default::default()
    }
}
