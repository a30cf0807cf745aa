//! Prediction aggregators.
//!
//! An `Aggregator` turns the neighbors of a query substance into a
//! prediction `Estimate`. Aggregators never fail: when no prediction is
//! possible they return an estimate without value and with a warning.
pub mod average;
pub mod local;
pub mod vote;

use indexmap::IndexMap;

use crate::config::AggregationMethod;
use crate::dataset::{Feature, Value};
use crate::descriptor::Descriptors;
use crate::error::{Error, Result};
use crate::neighbors::Neighbor;

pub use self::average::{weighted_average, WeightedAverage};
pub use self::local::{LocalFit, LocalModel, RidgeRegression, Trainer, TrainerRegistry, TrainingData};
pub use self::vote::{weighted_majority_vote, WeightedMajorityVote};

pub const NO_NEIGHBORS: &str = "Could not find similar substances with experimental data in the training dataset.";

/// Value predicted from a neighbor list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Estimate {
    pub value: Option<Value>,
    /// Class probabilities (classification only), in insertion order.
    pub probabilities: Option<IndexMap<String, f64>>,
    /// Prediction interval (local models only).
    pub interval: Option<(f64, f64)>,
    pub warnings: Vec<String>,
}

impl Estimate {
    /// An estimate without value.
    pub fn none<S: Into<String>>(warning: S) -> Estimate {
        Estimate {
            warnings: vec![warning.into()],
            ..Default::default()
        }
    }
}

/// Combines the measurements of neighbors into a prediction.
pub trait Aggregator: Send + Sync {
    /// `query` holds the descriptors of the query substance, for
    /// aggregators fitting a local model.
    fn aggregate(&self, neighbors: &[Neighbor], query: &Descriptors) -> Estimate;
}

/// Builds the aggregator for `method`, predicting `feature`.
///
/// # Errors
///
/// `BadRequest` for a method that does not fit the feature type or
/// names a trainer missing from `trainers`.
pub fn resolve(method: &AggregationMethod, feature: &Feature, trainers: &TrainerRegistry)
        -> Result<Box<dyn Aggregator>> {
    match (method, feature.accept_values()) {
        (&AggregationMethod::WeightedMajorityVote, Some(accept_values)) => {
            Ok(Box::new(WeightedMajorityVote::new(accept_values.to_vec())))
        }
        (&AggregationMethod::WeightedAverage, None) => Ok(Box::new(WeightedAverage)),
        (&AggregationMethod::LocalModel(ref name), accept_values) => {
            let trainer = trainers.get(name)
                                  .ok_or_else(|| Error::bad_request(format!("Unknown trainer '{}'", name)))?;
            Ok(match accept_values {
                Some(accept_values) => Box::new(LocalModel::classifier(name.clone(), trainer, accept_values.to_vec())),
                None => Box::new(LocalModel::new(name.clone(), trainer)),
            })
        }
        (method, _) => Err(Error::bad_request(format!("Aggregation method '{}' cannot predict feature '{}'",
                                                      method, feature.name))),
    }
}
