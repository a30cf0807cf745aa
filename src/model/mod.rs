//! Read-across models.
//!
//! A `Model` binds a training dataset, the feature it predicts and a
//! resolved configuration. It is immutable once created, so it can be
//! shared between threads and queried concurrently.
pub mod prediction;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::aggregate::{self, Aggregator};
use crate::config::{Algorithms, Config, Context, DescriptorMethod, ModelKind};
use crate::dataset::{representative, Dataset, Feature, FeatureId, Substance, SubstanceId, Value};
use crate::descriptor::{self, Descriptors};
use crate::error::{Error, Result};
use crate::neighbors::{Candidate, NeighborFinder};
use crate::selection::{self, Standardization};

pub use self::prediction::{is_predictable, result_dataset, Confidence, Prediction, ResultFeatures};

/// What to predict.
#[derive(Debug, Clone)]
pub enum Query {
    Substance(Substance),
    Substances(Vec<Substance>),
    Dataset(Dataset),
}

/// Result of `Model::predict()`, matching the shape of the `Query`.
#[derive(Debug, Clone)]
pub enum PredictionOutput {
    Single(Prediction),
    Batch(IndexMap<SubstanceId, Prediction>),
    /// Copy of the query dataset with prediction features.
    Dataset(Dataset),
}

/// Whether a prediction may return measured training values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Substances measured in the training data get their measured value.
    Predict,
    /// Every substance is predicted from its neighbors, as needed to
    /// score a model.
    Validate,
}

pub struct Model {
    kind: ModelKind,
    training: Arc<Dataset>,
    feature: Feature,
    config: Config,
    algorithms: Algorithms,
    context: Context,
    candidates: Vec<Candidate>,
    standardization: Option<Standardization>,
    finder: NeighborFinder,
    /// Finder at the lower threshold tried when a prediction has
    /// warnings.
    retry_finder: Option<NeighborFinder>,
    aggregator: Box<dyn Aggregator>,
}

impl Model {
    /// Creates a model predicting `feature` from `training`.
    ///
    /// Descriptors of all training substances are computed once here.
    /// Substances whose descriptors fail are left out of the neighbor
    /// pool and reported to the observer.
    ///
    /// # Errors
    ///
    /// `BadRequest` if the feature is unknown or cannot be predicted,
    /// if `config` is invalid for its type, or if no training substance
    /// has a value for it.
    pub fn create(training: &Dataset, feature: &FeatureId, config: &Config, context: &Context)
            -> Result<Model> {
        let feature = training.feature(feature)
                              .cloned()
                              .ok_or_else(|| Error::bad_request(format!("Unknown prediction feature '{}'",
                                                                        feature)))?;
        if !is_predictable(&feature) {
            return Err(Error::bad_request(format!("Feature '{}' cannot be predicted", feature.name)));
        }
        let kind = if feature.is_nominal() {
            ModelKind::Classification
        } else {
            ModelKind::Regression
        };
        let algorithms = config.resolve(kind)?;
        let aggregator = aggregate::resolve(&algorithms.aggregation, &feature, &context.trainers)?;

        let (mut candidates, failures) = Candidate::collect(training, &feature.id,
                                                            &algorithms.descriptors,
                                                            context.descriptors.as_ref());
        for (id, reason) in failures {
            context.observer.on_warning(&id, &reason);
        }
        if candidates.is_empty() {
            return Err(Error::bad_request(format!("No training substance with values for '{}'",
                                                  feature.name)));
        }

        let mut finder = NeighborFinder::new(algorithms.similarity, algorithms.min_similarity);
        let mut standardization = None;

        if let DescriptorMethod::Properties { ref names } = algorithms.descriptors {
            let s = {
                let rows = property_rows(&candidates);
                Standardization::fit(&rows, names.len())
            };
            for c in candidates.iter_mut() {
                c.descriptors = Arc::new(s.transform(&c.descriptors));
            }

            if algorithms.feature_selection.is_some() {
                let (rows, targets): (Vec<_>, Vec<_>) =
                    property_rows(&candidates).into_iter()
                                              .zip(&candidates)
                                              .filter_map(|(r, c)| {
                                                  representative(&c.measurements)
                                                      .and_then(|v| v.as_f64())
                                                      .map(|y| (r, y))
                                              })
                                              .unzip();
                let weights = selection::correlation_weights(&rows, &targets, names.len());
                let selected = weights.iter().filter(|w| !w.is_nan()).count();
                info!("Correlation filter kept {} of {} descriptors", selected, names.len());
                finder = finder.with_weights(weights);
            }
            standardization = Some(s);
        }

        let retry_finder = algorithms.retry_min_similarity.map(|t| finder.with_min_similarity(t));

        debug!("Created {:?} model for '{}' on {} training substances",
               kind, feature.name, candidates.len());

        Ok(Model {
            kind: kind,
            training: Arc::new(training.clone()),
            feature: feature,
            config: config.clone(),
            algorithms: algorithms,
            context: context.clone(),
            candidates: candidates,
            standardization: standardization,
            finder: finder,
            retry_finder: retry_finder,
            aggregator: aggregator,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn training(&self) -> &Dataset {
        &self.training
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Configuration as given at creation.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn algorithms(&self) -> &Algorithms {
        &self.algorithms
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// True if descriptor weights were fitted on the training data.
    pub fn has_feature_selection(&self) -> bool {
        self.algorithms.feature_selection.is_some()
    }

    /// Predicts a substance, a list of substances or a whole dataset.
    ///
    /// Per-substance faults end up in the warnings of that substance's
    /// prediction.
    ///
    /// # Errors
    ///
    /// `BadRequest` for an empty query, or if the result dataset cannot
    /// be assembled.
    pub fn predict(&self, query: &Query) -> Result<PredictionOutput> {
        match *query {
            Query::Substance(ref s) => Ok(PredictionOutput::Single(self.predict_substance(s, Mode::Predict))),
            Query::Substances(ref substances) => {
                if substances.is_empty() {
                    return Err(Error::bad_request("Empty list of query substances"));
                }
                let predictions = self.predict_all(substances, Mode::Predict);
                Ok(PredictionOutput::Batch(predictions.into_iter()
                                                      .map(|p| (p.substance.clone(), p))
                                                      .collect()))
            }
            Query::Dataset(ref dataset) => {
                if dataset.is_empty() {
                    return Err(Error::bad_request(format!("Query dataset '{}' is empty",
                                                          dataset.name())));
                }
                let predictions = self.predict_all(dataset.substances(), Mode::Predict);
                Ok(PredictionOutput::Dataset(result_dataset(dataset, &self.feature, &predictions)?))
            }
        }
    }

    /// Predictions of `substances`, in order, computed in parallel.
    pub fn predict_all(&self, substances: &[Substance], mode: Mode) -> Vec<Prediction> {
        substances.par_iter()
                  .map(|s| self.predict_substance(s, mode))
                  .collect()
    }

    /// Prediction of a single substance. Never fails: faults become
    /// warnings of a prediction without value.
    pub fn predict_substance(&self, substance: &Substance, mode: Mode) -> Prediction {
        let measurements = self.training.values(&substance.id, &self.feature.id).to_vec();

        let mut prediction = if mode == Mode::Predict && !measurements.is_empty() {
            self.measured(substance, &measurements)
        } else {
            self.estimate(substance)
        };
        prediction.measurements = measurements;

        for w in &prediction.warnings {
            self.context.observer.on_warning(&substance.id, w);
        }
        prediction
    }

    fn measured(&self, substance: &Substance, measurements: &[Value]) -> Prediction {
        Prediction {
            substance: substance.id.clone(),
            value: representative(measurements),
            confidence: Confidence::Measured,
            probabilities: None,
            interval: None,
            warnings: vec![format!("Substance '{}' has been measured in the training data, returning the measured value.",
                                   substance.id)],
            neighbors: vec![],
            measurements: vec![],
        }
    }

    fn estimate(&self, substance: &Substance) -> Prediction {
        let descriptors = match self.query_descriptors(substance) {
            Ok(d) => d,
            Err(e) => return Prediction::unavailable(substance.id.clone(), e.to_string()),
        };

        let neighbors = self.finder.find(substance, &descriptors, &self.candidates);
        let estimate = self.aggregator.aggregate(&neighbors, &descriptors);

        let (neighbors, estimate) = match self.retry_finder {
            Some(ref retry) if !estimate.warnings.is_empty() => {
                let neighbors = retry.find(substance, &descriptors, &self.candidates);
                let mut estimate = self.aggregator.aggregate(&neighbors, &descriptors);
                estimate.warnings.insert(0, format!("Similarity threshold {} < {}, prediction may be out of applicability domain.",
                                                    retry.min_similarity(), self.finder.min_similarity()));
                (neighbors, estimate)
            }
            _ => (neighbors, estimate),
        };

        let confidence = match estimate.value {
            None => Confidence::Unavailable,
            Some(Value::Nominal(ref class)) => {
                let p = estimate.probabilities
                                .as_ref()
                                .and_then(|p| p.get(class))
                                .cloned()
                                .unwrap_or(0.);
                Confidence::Estimated(p)
            }
            Some(Value::Numeric(_)) => {
                let mean = neighbors.iter().map(|n| n.similarity).sum::<f64>() / neighbors.len() as f64;
                Confidence::Estimated(mean)
            }
        };

        Prediction {
            substance: substance.id.clone(),
            value: estimate.value,
            confidence: confidence,
            probabilities: estimate.probabilities,
            interval: estimate.interval,
            warnings: estimate.warnings,
            neighbors: neighbors,
            measurements: vec![],
        }
    }

    fn query_descriptors(&self, substance: &Substance) -> Result<Descriptors> {
        let d = descriptor::calculate(&self.algorithms.descriptors, self.context.descriptors.as_ref(),
                                      substance)?;
        Ok(match self.standardization {
            Some(ref s) => s.transform(&d),
            None => d,
        })
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Model")
         .field("kind", &self.kind)
         .field("training", &self.training.name())
         .field("feature", &self.feature.id)
         .field("algorithms", &self.algorithms)
         .field("candidates", &self.candidates.len())
         .finish()
    }
}

fn property_rows(candidates: &[Candidate]) -> Vec<&[Option<f64>]> {
    candidates.iter()
              .filter_map(|c| match *c.descriptors {
                  Descriptors::Properties(ref p) => Some(p.as_slice()),
                  Descriptors::Fingerprint(_) => None,
              })
              .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DescriptorMethod, FeatureSelection};
    use crate::descriptor::DescriptorTable;

    fn regression() -> (Dataset, Context) {
        let feature = Feature::numeric("logc", "log concentration", None);
        let mut ds = Dataset::new("train");
        ds.add_feature(feature.clone());
        let mut table = DescriptorTable::new();
        for &(id, ref tokens, y) in &[("c1", vec!["A", "B"], 1.), ("c2", vec!["A", "C"], 3.)] {
            let s = Substance::new(id);
            table.add_fingerprint(&s.id, "MP2D", tokens.clone());
            ds.add_substance(s.clone());
            ds.add_value(&s.id, &feature.id, Value::Numeric(y)).unwrap();
        }
        table.add_fingerprint(&SubstanceId::from("q"), "MP2D", vec!["A"]);
        table.add_fingerprint(&SubstanceId::from("far"), "MP2D", vec!["A", "D", "E"]);
        (ds, Context::new(Arc::new(table)))
    }

    /// Two neighbors with tanimoto similarity 0.5 each: the prediction
    /// is their plain average.
    #[test]
    fn weighted_average() {
        let (ds, context) = regression();
        let mut config = Config::default();
        config.min_similarity = Some(0.);
        let model = Model::create(&ds, &FeatureId::from("logc"), &config, &context).unwrap();

        let p = model.predict_substance(&Substance::new("q"), Mode::Predict);

        assert!(p.value == Some(Value::Numeric(2.)));
        assert!(p.confidence == Confidence::Estimated(0.5));
        assert!(p.neighbors.len() == 2);
        assert!(p.warnings.is_empty());
    }

    /// Verify that a substance without neighbors at the similarity
    /// threshold is predicted at the lower retry threshold, with a
    /// warning.
    #[test]
    fn retry_threshold() {
        let (ds, context) = regression();
        let far = Substance::new("far");

        // Both training substances are 0.25 similar to "far".
        let model = Model::create(&ds, &FeatureId::from("logc"), &Config::default(), &context)
                          .unwrap();
        let p = model.predict_substance(&far, Mode::Predict);
        assert!(p.value.is_none());
        assert!(p.neighbors.is_empty());

        let mut config = Config::default();
        config.retry_min_similarity = Some(0.2);
        let model = Model::create(&ds, &FeatureId::from("logc"), &config, &context).unwrap();

        let p = model.predict_substance(&far, Mode::Predict);
        assert!(p.value == Some(Value::Numeric(2.)));
        assert!(p.neighbors.len() == 2);
        assert!(p.confidence == Confidence::Estimated(0.25));
        assert!(p.warnings
                == vec!["Similarity threshold 0.2 < 0.5, prediction may be out of applicability domain."
                            .to_string()]);

        // Predictions without warnings are kept.
        let p = model.predict_substance(&Substance::new("q"), Mode::Predict);
        assert!(p.value == Some(Value::Numeric(2.)));
        assert!(p.warnings.is_empty());
    }

    /// Verify that measured substances are only shortcut outside of
    /// validation.
    #[test]
    fn measured_shortcut() {
        let (ds, context) = regression();
        let model = Model::create(&ds, &FeatureId::from("logc"), &Config::default(), &context)
                          .unwrap();
        let c1 = Substance::new("c1");

        let p = model.predict_substance(&c1, Mode::Predict);
        assert!(p.is_measured());
        assert!(p.value == Some(Value::Numeric(1.)));
        assert!(p.warnings.len() == 1);

        let p = model.predict_substance(&c1, Mode::Validate);
        assert!(!p.is_measured());
        assert!(p.neighbors.iter().all(|n| n.substance != c1.id));
        assert!(p.measurements == vec![Value::Numeric(1.)]);
    }

    /// Verify that a substance without descriptors gets a warning, not
    /// an error.
    #[test]
    fn descriptor_failure() {
        let (ds, context) = regression();
        let model = Model::create(&ds, &FeatureId::from("logc"), &Config::default(), &context)
                          .unwrap();

        let p = model.predict_substance(&Substance::new("unknown"), Mode::Predict);

        assert!(p.value.is_none());
        assert!(p.confidence == Confidence::Unavailable);
        assert!(p.warnings.len() == 1);
    }

    #[test]
    fn queries() {
        let (ds, context) = regression();
        let mut config = Config::default();
        config.min_similarity = Some(0.);
        let model = Model::create(&ds, &FeatureId::from("logc"), &config, &context).unwrap();

        assert!(model.predict(&Query::Substances(vec![])).is_err());
        assert!(model.predict(&Query::Dataset(Dataset::new("empty"))).is_err());

        match model.predict(&Query::Substances(vec![Substance::new("q"), Substance::new("c1")])) {
            Ok(PredictionOutput::Batch(predictions)) => {
                let ids = predictions.keys().map(|k| k.0.as_str()).collect::<Vec<_>>();
                assert!(ids == vec!["q", "c1"]);
            }
            other => panic!("Unexpected output {:?}", other),
        }

        let mut query = Dataset::new("query");
        query.add_substance(Substance::new("q"));
        query.add_substance(Substance::new("x"));
        match model.predict(&Query::Dataset(query)) {
            Ok(PredictionOutput::Dataset(result)) => {
                let features = ResultFeatures::new(model.feature());
                assert!(result.len() == 2);
                let q = features.read(&result, &SubstanceId::from("q")).unwrap();
                assert!(q.value == Some(Value::Numeric(2.)));
                let x = features.read(&result, &SubstanceId::from("x")).unwrap();
                assert!(x.value.is_none());
                assert!(!x.warnings.is_empty());
            }
            other => panic!("Unexpected output {:?}", other),
        }
    }

    #[test]
    fn invalid_models() {
        let (ds, context) = regression();
        assert!(Model::create(&ds, &FeatureId::from("tox"), &Config::default(), &context).is_err());

        let mut config = Config::default();
        config.aggregation = Some(crate::config::AggregationMethod::WeightedMajorityVote);
        assert!(Model::create(&ds, &FeatureId::from("logc"), &config, &context).is_err());

        let mut empty = Dataset::new("empty");
        empty.add_feature(Feature::numeric("logc", "log concentration", None));
        empty.add_substance(Substance::new("c1"));
        assert!(Model::create(&empty, &FeatureId::from("logc"), &Config::default(), &context)
                      .is_err());
    }

    /// Verify that the correlation filter drops uncorrelated properties.
    #[test]
    fn feature_selection() {
        let feature = Feature::numeric("logc", "log concentration", None);
        let mut ds = Dataset::new("train");
        ds.add_feature(feature.clone());
        let mut table = DescriptorTable::new();
        let noise = [0.3, -1.2, 0.8, -0.1, 0.5, -0.9, 1.1, -0.4];
        for i in 0..8 {
            let s = Substance::new(format!("c{}", i));
            table.add_property(&s.id, "logP", i as f64);
            table.add_property(&s.id, "noise", noise[i]);
            ds.add_substance(s.clone());
            ds.add_value(&s.id, &feature.id, Value::Numeric(2. * i as f64)).unwrap();
        }
        let context = Context::new(Arc::new(table));

        let mut config = Config::default();
        config.descriptors = Some(DescriptorMethod::Properties {
            names: vec!["logP".into(), "noise".into()],
        });
        config.feature_selection = Some(FeatureSelection::CorrelationFilter);
        let model = Model::create(&ds, &feature.id, &config, &context).unwrap();

        assert!(model.has_feature_selection());
        assert!(model.algorithms().similarity == crate::config::SimilarityMethod::WeightedCosine);
    }
}
