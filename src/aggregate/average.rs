//! Weighted average for regression.
use crate::aggregate::{Aggregator, Estimate, NO_NEIGHBORS};
use crate::dataset::Value;
use crate::descriptor::Descriptors;
use crate::neighbors::Neighbor;

/// Similarity-weighted mean of the neighbors' measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedAverage;

impl Aggregator for WeightedAverage {
    fn aggregate(&self, neighbors: &[Neighbor], _query: &Descriptors) -> Estimate {
        weighted_average(neighbors)
    }
}

/// `Σ (s / S)·v` over every (neighbor, measurement) pair, with `S = Σ s`.
///
/// Weights are normalized before summing so that equal or single
/// weights reproduce the measurements exactly.
pub fn weighted_average(neighbors: &[Neighbor]) -> Estimate {
    let pairs = neighbors.iter()
                         .flat_map(|n| {
                             n.measurements.iter().filter_map(Value::as_f64).map(move |v| (n.similarity, v))
                         })
                         .collect::<Vec<_>>();

    if pairs.is_empty() {
        return Estimate::none(NO_NEIGHBORS);
    }
    let sim_sum = pairs.iter().map(|&(s, _)| s).sum::<f64>();
    if !(sim_sum > 0.) {
        return Estimate::none("Similar substances have zero similarity, cannot weight their measurements.");
    }

    let value = pairs.iter().map(|&(s, v)| (s / sim_sum) * v).sum::<f64>();

    Estimate {
        value: Some(Value::Numeric(value)),
        ..Default::default()
    }
}
