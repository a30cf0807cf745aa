//! Model validation.
//!
//! Every validator builds models on training partitions only and
//! predicts held-out substances in `Mode::Validate`, so measured values
//! never leak into the reported statistics.
pub mod crossvalidation;
pub mod loo;
pub mod repeated;
pub mod statistics;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::config::Config;
use crate::dataset::{FeatureId, SubstanceId};
use crate::model::{Model, Prediction};

pub use self::crossvalidation::{folds, CrossValidation};
pub use self::loo::LeaveOneOut;
pub use self::repeated::{RepeatedCrossValidation, DEFAULT_REPEATS};
pub use self::statistics::{ClassificationStatistics, RegressionStatistics, Statistics};
pub use self::train_test::TrainTest;

/// Predictions of held-out substances and their statistics.
#[derive(Debug, Clone)]
pub struct Validation {
    training: String,
    feature: FeatureId,
    config: Config,
    predictions: IndexMap<SubstanceId, Prediction>,
    nr_instances: usize,
    nr_unpredicted: usize,
    statistics: Statistics,
    warnings: Vec<String>,
    finished_at: DateTime<Utc>,
}

impl Validation {
    /// Scores `predictions` of `model`'s feature and marks the
    /// validation as finished.
    pub(crate) fn finish(model: &Model, predictions: Vec<Prediction>, mut warnings: Vec<String>)
            -> Validation {
        let nr_instances = predictions.len();
        let nr_unpredicted = predictions.iter().filter(|p| !p.is_predicted()).count();
        let (statistics, stat_warnings) = Statistics::compute(model.feature(), &predictions);
        warnings.extend(stat_warnings);

        Validation {
            training: model.training().name().to_string(),
            feature: model.feature().id.clone(),
            config: model.config().clone(),
            predictions: predictions.into_iter().map(|p| (p.substance.clone(), p)).collect(),
            nr_instances: nr_instances,
            nr_unpredicted: nr_unpredicted,
            statistics: statistics,
            warnings: warnings,
            finished_at: Utc::now(),
        }
    }

    /// Name of the dataset the validated model was trained on.
    pub fn training(&self) -> &str {
        &self.training
    }

    pub fn feature(&self) -> &FeatureId {
        &self.feature
    }

    /// Configuration of the validated model.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn predictions(&self) -> &IndexMap<SubstanceId, Prediction> {
        &self.predictions
    }

    pub fn nr_instances(&self) -> usize {
        self.nr_instances
    }

    pub fn nr_unpredicted(&self) -> usize {
        self.nr_unpredicted
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}
