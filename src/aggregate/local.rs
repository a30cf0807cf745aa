//! Local models fitted on the neighbors of a query.
//!
//! Model fitting itself sits behind the `Trainer` trait. `LocalModel`
//! builds the training data from the neighbors, calls the trainer, and
//! falls back to the weighted average (regression) or the weighted
//! majority vote (classification) whenever a local model cannot be built
//! or fails.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rusty_machine::linalg::{BaseMatrix, Matrix, Vector};

use crate::aggregate::{weighted_average, weighted_majority_vote, Aggregator, Estimate};
use crate::dataset::Value;
use crate::descriptor::Descriptors;
use crate::error::{Error, Result};
use crate::neighbors::Neighbor;

/// Fewest neighbors a local model is fitted on.
pub const MIN_NEIGHBORS: usize = 3;

/// Training data of a local model: one row per (neighbor, measurement)
/// pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    /// Measured values. For classification, the index of the measured
    /// class in `classes`.
    pub dependent: Vec<f64>,
    /// Independent variables, stored by column.
    pub independent: Vec<Vec<f64>>,
    /// Similarity of each row's neighbor to the query.
    pub weights: Vec<f64>,
    /// Independent variables of the query, one per column.
    pub query: Vec<f64>,
    /// Classes of a classification problem; empty for regression.
    pub classes: Vec<String>,
}

impl TrainingData {
    pub fn nr_rows(&self) -> usize {
        self.dependent.len()
    }

    pub fn nr_columns(&self) -> usize {
        self.independent.len()
    }

    pub fn is_classification(&self) -> bool {
        !self.classes.is_empty()
    }

    /// Builds regression training data from the numeric measurements,
    /// dropping variables that are missing for any row or for the query
    /// and variables that are constant.
    ///
    /// Fingerprints become one presence column per token seen among the
    /// neighbors. Returns `None` if no variable remains or if the
    /// descriptors of query and neighbors are of different kinds.
    pub fn from_neighbors(neighbors: &[Neighbor], query: &Descriptors) -> Option<TrainingData> {
        let rows = neighbors.iter()
                            .flat_map(|n| {
                                n.measurements
                                 .iter()
                                 .filter_map(Value::as_f64)
                                 .map(move |v| (v, n.similarity, &*n.descriptors))
                            })
                            .collect();
        TrainingData::build(rows, query, vec![])
    }

    /// Builds classification training data from the measurements whose
    /// class is one of `classes`. Variables are selected as in
    /// `from_neighbors`.
    pub fn from_classified_neighbors(neighbors: &[Neighbor], query: &Descriptors, classes: &[String])
            -> Option<TrainingData> {
        let rows = neighbors.iter()
                            .flat_map(|n| {
                                n.measurements
                                 .iter()
                                 .filter_map(Value::as_str)
                                 .filter_map(move |c| classes.iter().position(|a| a == c))
                                 .map(move |k| (k as f64, n.similarity, &*n.descriptors))
                            })
                            .collect();
        TrainingData::build(rows, query, classes.to_vec())
    }

    fn build(rows: Vec<(f64, f64, &Descriptors)>, query: &Descriptors, classes: Vec<String>)
            -> Option<TrainingData> {
        let dependent = rows.iter().map(|&(v, _, _)| v).collect::<Vec<_>>();
        let weights = rows.iter().map(|&(_, w, _)| w).collect::<Vec<_>>();

        let (columns, query_values) = match *query {
            Descriptors::Fingerprint(ref q) => {
                let mut fingerprints = vec![];
                for &(_, _, d) in &rows {
                    match *d {
                        Descriptors::Fingerprint(ref fp) => fingerprints.push(fp),
                        Descriptors::Properties(_) => return None,
                    }
                }
                let tokens = fingerprints.iter()
                                         .flat_map(|fp| fp.iter())
                                         .collect::<BTreeSet<_>>();
                let presence = |fp: &BTreeSet<String>, t: &String| if fp.contains(t) { 1. } else { 0. };
                let columns = tokens.iter()
                                    .map(|t| fingerprints.iter().map(|fp| Some(presence(*fp, *t))).collect())
                                    .collect::<Vec<Vec<_>>>();
                let query_values = tokens.iter().map(|t| Some(presence(q, *t))).collect::<Vec<_>>();
                (columns, query_values)
            }
            Descriptors::Properties(ref q) => {
                let mut properties = vec![];
                for &(_, _, d) in &rows {
                    match *d {
                        Descriptors::Properties(ref p) if p.len() == q.len() => properties.push(p),
                        _ => return None,
                    }
                }
                let columns = (0..q.len())
                    .map(|j| properties.iter().map(|p| p[j].filter(|v| !v.is_nan())).collect())
                    .collect::<Vec<Vec<_>>>();
                (columns, q.iter().map(|v| v.filter(|v| !v.is_nan())).collect())
            }
        };

        let mut independent = vec![];
        let mut query = vec![];
        for (column, q) in columns.into_iter().zip(query_values) {
            let q = match q {
                Some(q) => q,
                None => continue,
            };
            let column = match column.into_iter().collect::<Option<Vec<f64>>>() {
                Some(c) => c,
                None => continue,
            };
            if column.windows(2).all(|w| w[0] == w[1]) {
                continue;
            }
            independent.push(column);
            query.push(q);
        }

        if independent.is_empty() || dependent.is_empty() {
            return None;
        }

        Some(TrainingData {
            dependent: dependent,
            independent: independent,
            weights: weights,
            query: query,
            classes: classes,
        })
    }

    /// Checks that every column, the weights and the query match the
    /// number of rows, and that class indices are in range.
    pub fn validate(&self) -> Result<()> {
        let n = self.nr_rows();
        if n == 0
           || self.weights.len() != n
           || self.query.len() != self.nr_columns()
           || self.independent.iter().any(|column| column.len() != n)
        {
            return Err(Error::trainer("inconsistent training data"));
        }
        if self.is_classification()
           && self.dependent.iter().any(|&k| !(k >= 0. && k.fract() == 0. && (k as usize) < self.classes.len()))
        {
            return Err(Error::trainer("class index out of range"));
        }
        Ok(())
    }
}

/// Prediction of a local model.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFit {
    /// Numeric value for regression, one of the classes for
    /// classification.
    pub value: Value,
    /// Class probabilities (classification only).
    pub probabilities: Option<IndexMap<String, f64>>,
    pub interval: Option<(f64, f64)>,
    pub warnings: Vec<String>,
}

/// Fits a model on `TrainingData` and predicts its query.
pub trait Trainer: Send + Sync {
    fn fit_and_predict(&self, data: &TrainingData) -> Result<LocalFit>;
}

/// Similarity-weighted ridge regression.
///
/// The intercept is not penalized. For regression, the prediction
/// interval is `value ± 1.96 · RMSE`, with the weighted RMSE of the fit.
/// Classes are fitted one-vs-rest on indicator targets; the scores of
/// the query, clipped to `[0, 1]`, are normalized into probabilities.
#[derive(Debug, Clone, Copy)]
pub struct RidgeRegression {
    pub lambda: f64,
}

impl Default for RidgeRegression {
    fn default() -> RidgeRegression {
        RidgeRegression { lambda: 1e-3 }
    }
}

fn predict(beta: &[f64], row: &[f64]) -> f64 {
    beta[0] + row.iter().zip(&beta[1..]).map(|(v, b)| b * v).sum::<f64>()
}

fn row(data: &TrainingData, i: usize) -> Vec<f64> {
    data.independent.iter().map(|column| column[i]).collect()
}

impl RidgeRegression {
    /// Coefficients (intercept first) for each of `targets`.
    fn fit(&self, data: &TrainingData, targets: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = data.nr_rows();
        let p = data.nr_columns() + 1;

        // Rows scaled by sqrt(w), with a leading intercept column.
        let sqrt_weights = data.weights.iter().map(|w| w.max(0.).sqrt()).collect::<Vec<_>>();
        let mut design = Vec::with_capacity(n * p);
        for i in 0..n {
            let sw = sqrt_weights[i];
            design.push(sw);
            design.extend(data.independent.iter().map(|column| sw * column[i]));
        }
        let x = Matrix::new(n, p, design);

        let xt = x.transpose();
        let mut normal = &xt * &x;
        for j in 1..p {
            normal[[j, j]] += self.lambda;
        }

        targets.iter()
               .map(|target| {
                   let y = Vector::new(target.iter().zip(&sqrt_weights).map(|(t, sw)| sw * t).collect::<Vec<_>>());
                   let rhs = &xt * &y;
                   normal.solve(rhs)
                         .map(|beta| beta.into_vec())
                         .map_err(|e| Error::trainer(e.to_string()))
               })
               .collect()
    }

    fn regress(&self, data: &TrainingData) -> Result<LocalFit> {
        let betas = self.fit(data, &[data.dependent.clone()])?;
        let beta = &betas[0];

        let value = predict(beta, &data.query);
        let mut sq_error = 0.;
        let mut weight_sum = 0.;
        for i in 0..data.nr_rows() {
            let w = data.weights[i].max(0.);
            sq_error += w * (data.dependent[i] - predict(beta, &row(data, i))).powi(2);
            weight_sum += w;
        }
        if !(weight_sum > 0.) {
            return Err(Error::trainer("all rows have zero weight"));
        }
        let rmse = (sq_error / weight_sum).sqrt();

        Ok(LocalFit {
            value: Value::Numeric(value),
            probabilities: None,
            interval: Some((value - 1.96 * rmse, value + 1.96 * rmse)),
            warnings: vec![],
        })
    }

    fn classify(&self, data: &TrainingData) -> Result<LocalFit> {
        let targets = (0..data.classes.len())
            .map(|k| data.dependent.iter().map(|&c| if c as usize == k { 1. } else { 0. }).collect())
            .collect::<Vec<Vec<f64>>>();
        let betas = self.fit(data, &targets)?;

        let scores = betas.iter()
                          .map(|beta| predict(beta, &data.query))
                          .map(|s| if s.is_nan() { 0. } else { s.max(0.).min(1.) })
                          .collect::<Vec<_>>();
        let total = scores.iter().sum::<f64>();
        if !(total > 0.) {
            return Err(Error::trainer("no class has a positive score"));
        }

        let mut best = 0;
        for (k, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = k;
            }
        }
        let probabilities: IndexMap<String, f64> =
            data.classes.iter().zip(&scores).map(|(c, s)| (c.clone(), s / total)).collect();

        Ok(LocalFit {
            value: Value::Nominal(data.classes[best].clone()),
            probabilities: Some(probabilities),
            interval: None,
            warnings: vec![],
        })
    }
}

impl Trainer for RidgeRegression {
    fn fit_and_predict(&self, data: &TrainingData) -> Result<LocalFit> {
        data.validate()?;
        if data.is_classification() {
            self.classify(data)
        } else {
            self.regress(data)
        }
    }
}

/// Named trainers available to local models.
///
/// The default registry holds `RidgeRegression` as "ridge".
#[derive(Clone)]
pub struct TrainerRegistry {
    trainers: BTreeMap<String, Arc<dyn Trainer>>,
}

impl TrainerRegistry {
    /// Registry without any trainer.
    pub fn empty() -> TrainerRegistry {
        TrainerRegistry { trainers: BTreeMap::new() }
    }

    /// Adds (or replaces) the trainer called `name`.
    pub fn register<S: Into<String>>(&mut self, name: S, trainer: Arc<dyn Trainer>) {
        self.trainers.insert(name.into(), trainer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Trainer>> {
        self.trainers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.trainers.keys().map(|k| k.as_str()).collect()
    }
}

impl Default for TrainerRegistry {
    fn default() -> TrainerRegistry {
        let mut registry = TrainerRegistry::empty();
        registry.register("ridge", Arc::new(RidgeRegression::default()));
        registry
    }
}

impl fmt::Debug for TrainerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.trainers.keys()).finish()
    }
}

/// Aggregator predicting with a local model fitted on the neighbors.
pub struct LocalModel {
    name: String,
    trainer: Arc<dyn Trainer>,
    /// Classes of a nominal feature; `None` for regression.
    accept_values: Option<Vec<String>>,
}

impl LocalModel {
    /// Local regression model.
    pub fn new(name: String, trainer: Arc<dyn Trainer>) -> LocalModel {
        LocalModel {
            name: name,
            trainer: trainer,
            accept_values: None,
        }
    }

    /// Local classification model predicting one of `accept_values`.
    pub fn classifier(name: String, trainer: Arc<dyn Trainer>, accept_values: Vec<String>) -> LocalModel {
        LocalModel {
            name: name,
            trainer: trainer,
            accept_values: Some(accept_values),
        }
    }

    fn fallback(&self, neighbors: &[Neighbor], reason: String) -> Estimate {
        let (mut estimate, method) = match self.accept_values {
            Some(ref accept_values) => {
                (weighted_majority_vote(neighbors, accept_values), "weighted majority vote")
            }
            None => (weighted_average(neighbors), "weighted average"),
        };
        if estimate.value.is_some() {
            estimate.warnings.push(format!("{} Using {} of similar substances.", reason, method));
        }
        estimate
    }

    fn regress(&self, neighbors: &[Neighbor], data: &TrainingData) -> Estimate {
        let fit = match self.trainer.fit_and_predict(data) {
            Ok(fit) => fit,
            Err(e) => return self.fallback(neighbors, format!("Local model '{}' failed: {}.", self.name, e)),
        };
        let value = match fit.value.as_f64() {
            Some(v) if v.is_finite() => v,
            _ => {
                return self.fallback(neighbors,
                                     format!("Local model '{}' returned no usable prediction.", self.name))
            }
        };
        let interval = fit.interval.filter(|&(lo, hi)| lo.is_finite() && hi.is_finite());
        Estimate {
            value: Some(Value::Numeric(value)),
            probabilities: None,
            interval: interval,
            warnings: fit.warnings,
        }
    }

    fn classify(&self, neighbors: &[Neighbor], data: &TrainingData) -> Estimate {
        if data.dependent.windows(2).all(|w| w[0] == w[1]) {
            return self.fallback(neighbors, "All neighbors have the same measured class.".to_string());
        }
        let fit = match self.trainer.fit_and_predict(data) {
            Ok(fit) => fit,
            Err(e) => return self.fallback(neighbors, format!("Local model '{}' failed: {}.", self.name, e)),
        };
        let class = match (fit.value.as_str(), fit.probabilities.as_ref()) {
            (Some(c), Some(_)) if data.classes.iter().any(|a| a == c) => c.to_string(),
            _ => {
                return self.fallback(neighbors,
                                     format!("Local model '{}' returned no usable prediction.", self.name))
            }
        };

        let fitted = fit.probabilities.unwrap_or_default();
        let probabilities: IndexMap<String, f64> =
            data.classes
                .iter()
                .map(|c| (c.clone(), fitted.get(c).cloned().filter(|p| p.is_finite()).unwrap_or(0.)))
                .collect();
        Estimate {
            value: Some(Value::Nominal(class)),
            probabilities: Some(probabilities),
            interval: None,
            warnings: fit.warnings,
        }
    }
}

impl Aggregator for LocalModel {
    fn aggregate(&self, neighbors: &[Neighbor], query: &Descriptors) -> Estimate {
        let measured = |v: &Value| match self.accept_values {
            Some(_) => v.as_str().is_some(),
            None => v.as_f64().is_some(),
        };
        let nr_neighbors = neighbors.iter()
                                    .filter(|n| n.measurements.iter().any(|v| measured(v)))
                                    .count();
        if nr_neighbors < MIN_NEIGHBORS {
            return self.fallback(neighbors,
                                 format!("Insufficient number of neighbors ({}) for a local model.",
                                         nr_neighbors));
        }

        let data = match self.accept_values {
            Some(ref accept_values) => TrainingData::from_classified_neighbors(neighbors, query, accept_values),
            None => TrainingData::from_neighbors(neighbors, query),
        };
        let data = match data {
            Some(data) => data,
            None => {
                return self.fallback(neighbors,
                                     "No usable independent variables for a local model.".to_string())
            }
        };

        if self.accept_values.is_some() {
            self.classify(neighbors, &data)
        } else {
            self.regress(neighbors, &data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SubstanceId;

    fn neighbor(similarity: f64, properties: Vec<Option<f64>>, value: f64) -> Neighbor {
        labelled(similarity, properties, Value::Numeric(value))
    }

    fn labelled(similarity: f64, properties: Vec<Option<f64>>, value: Value) -> Neighbor {
        Neighbor {
            substance: SubstanceId::from("c"),
            similarity: similarity,
            measurements: vec![value],
            descriptors: Arc::new(Descriptors::Properties(properties)),
        }
    }

    /// Neighbors on the line `y = 2x + 1`.
    fn linear() -> Vec<Neighbor> {
        (0..6).map(|i| {
                  let x = i as f64;
                  neighbor(0.9 - 0.1 * x, vec![Some(x), Some(5.)], 2. * x + 1.)
              })
              .collect()
    }

    fn classes() -> Vec<String> {
        vec!["active".to_string(), "inactive".to_string()]
    }

    /// Neighbors with `x < 3` are active, the others inactive.
    fn separable() -> Vec<Neighbor> {
        (0..6).map(|i| {
                  let x = i as f64;
                  let class = if i < 3 { "active" } else { "inactive" };
                  labelled(0.9 - 0.1 * x, vec![Some(x), Some(5.)], Value::Nominal(class.into()))
              })
              .collect()
    }

    struct Failing;

    impl Trainer for Failing {
        fn fit_and_predict(&self, _data: &TrainingData) -> Result<LocalFit> {
            Err(Error::trainer("singular"))
        }
    }

    /// Always predicts "inactive" with the given probability.
    struct Inactive(f64);

    impl Trainer for Inactive {
        fn fit_and_predict(&self, data: &TrainingData) -> Result<LocalFit> {
            let mut probabilities = IndexMap::new();
            probabilities.insert("inactive".to_string(), self.0);
            Ok(LocalFit {
                value: Value::Nominal("inactive".into()),
                probabilities: Some(probabilities),
                interval: None,
                warnings: vec![format!("{} rows", data.nr_rows())],
            })
        }
    }

    /// Verify that constant and missing variables are dropped.
    #[test]
    fn training_data() {
        let mut neighbors = linear();
        neighbors[0] = neighbor(0.9, vec![Some(0.), Some(5.)], 1.);
        let query = Descriptors::Properties(vec![Some(2.5), Some(5.)]);

        let data = TrainingData::from_neighbors(&neighbors, &query).unwrap();
        assert!(data.nr_rows() == 6);
        assert!(data.nr_columns() == 1);
        assert!(data.query == vec![2.5]);
        assert!(!data.is_classification());

        let missing = Descriptors::Properties(vec![None, Some(5.)]);
        assert!(TrainingData::from_neighbors(&neighbors, &missing).is_none());
    }

    /// Verify that classes are encoded by their position, and that
    /// measurements of other classes are left out.
    #[test]
    fn classified_training_data() {
        let mut neighbors = separable();
        neighbors.push(labelled(0.2, vec![Some(9.), Some(5.)], Value::Nominal("unknown".into())));
        let query = Descriptors::Properties(vec![Some(0.5), Some(5.)]);

        let data = TrainingData::from_classified_neighbors(&neighbors, &query, &classes()).unwrap();

        assert!(data.is_classification());
        assert!(data.dependent == vec![0., 0., 0., 1., 1., 1.]);
        assert!(data.nr_columns() == 1);
        assert!(data.validate().is_ok());
        assert!(TrainingData::from_neighbors(&neighbors, &query).is_none());
    }

    #[test]
    fn fingerprint_columns() {
        let fp = |tokens: &[&str]| {
            Arc::new(Descriptors::Fingerprint(tokens.iter().map(|t| t.to_string()).collect()))
        };
        let neighbors = vec![Neighbor { substance: "a".into(), similarity: 0.8,
                                        measurements: vec![Value::Numeric(1.)], descriptors: fp(&["A", "B"]) },
                             Neighbor { substance: "b".into(), similarity: 0.7,
                                        measurements: vec![Value::Numeric(2.)], descriptors: fp(&["A", "C"]) }];
        let query = Descriptors::Fingerprint(["A", "C"].iter().map(|t| t.to_string()).collect());

        let data = TrainingData::from_neighbors(&neighbors, &query).unwrap();

        // "A" is constant.
        assert!(data.independent == vec![vec![1., 0.], vec![0., 1.]]);
        assert!(data.query == vec![0., 1.]);
    }

    #[test]
    fn ridge_recovers_line() {
        let query = Descriptors::Properties(vec![Some(2.5), Some(5.)]);
        let model = LocalModel::new("ridge".into(), Arc::new(RidgeRegression { lambda: 0. }));

        let e = model.aggregate(&linear(), &query);
        let value = e.value.and_then(|v| v.as_f64()).unwrap();
        let (lo, hi) = e.interval.unwrap();

        assert!((value - 6.).abs() < 1e-6);
        assert!(lo <= value && value <= hi);
        assert!(hi - lo < 1e-4);
        assert!(e.warnings.is_empty());
    }

    /// Verify that training data with a column shorter than the
    /// dependent variable is rejected instead of indexed.
    #[test]
    fn ridge_rejects_ragged_columns() {
        let data = TrainingData {
            dependent: vec![1., 2., 3.],
            independent: vec![vec![0., 1., 2.], vec![1., 0.]],
            weights: vec![1., 1., 1.],
            query: vec![0.5, 0.5],
            classes: vec![],
        };
        assert!(data.validate().is_err());
        assert!(RidgeRegression::default().fit_and_predict(&data).is_err());

        let data = TrainingData {
            dependent: vec![0., 2., 1.],
            independent: vec![vec![0., 1., 2.]],
            weights: vec![1., 1., 1.],
            query: vec![0.5],
            classes: classes(),
        };
        assert!(RidgeRegression::default().fit_and_predict(&data).is_err());
    }

    #[test]
    fn ridge_classifies() {
        let query = Descriptors::Properties(vec![Some(0.5), Some(5.)]);
        let model = LocalModel::classifier("ridge".into(), Arc::new(RidgeRegression::default()), classes());

        let e = model.aggregate(&separable(), &query);
        let probabilities = e.probabilities.unwrap();

        assert!(e.value == Some(Value::Nominal("active".into())));
        assert!(probabilities.keys().cloned().collect::<Vec<_>>() == classes());
        assert!(probabilities["active"] > 0.5);
        assert!((probabilities["active"] + probabilities["inactive"] - 1.).abs() < 1e-12);
        assert!(e.interval.is_none());
        assert!(e.warnings.is_empty());
    }

    /// Verify that a custom classification trainer's prediction is used,
    /// with zero probability for classes it does not report.
    #[test]
    fn custom_classifier() {
        let query = Descriptors::Properties(vec![Some(0.5), Some(5.)]);
        let model = LocalModel::classifier("inactive".into(), Arc::new(Inactive(0.7)), classes());

        let e = model.aggregate(&separable(), &query);
        let probabilities = e.probabilities.unwrap();

        assert!(e.value == Some(Value::Nominal("inactive".into())));
        assert!(probabilities["inactive"] == 0.7);
        assert!(probabilities["active"] == 0.);
        assert!(e.warnings == vec!["6 rows".to_string()]);
    }

    #[test]
    fn fallback_on_few_neighbors() {
        let query = Descriptors::Properties(vec![Some(2.5), Some(5.)]);
        let model = LocalModel::new("ridge".into(), Arc::new(RidgeRegression::default()));
        let neighbors = &linear()[..2];

        let e = model.aggregate(neighbors, &query);

        assert!(e.value == weighted_average(neighbors).value);
        assert!(e.interval.is_none());
        assert!(e.warnings.len() == 1);
    }

    /// Verify that neighbors with constant descriptors give the weighted
    /// average with a warning.
    #[test]
    fn fallback_without_variables() {
        let query = Descriptors::Properties(vec![Some(2.5), Some(5.)]);
        let model = LocalModel::new("ridge".into(), Arc::new(RidgeRegression::default()));
        let neighbors = (0..4).map(|i| neighbor(0.8, vec![Some(1.), Some(5.)], i as f64))
                              .collect::<Vec<_>>();

        let e = model.aggregate(&neighbors, &query);

        assert!(e.value == weighted_average(&neighbors).value);
        assert!(e.interval.is_none());
        assert!(e.warnings.len() == 1);
        assert!(e.warnings[0].starts_with("No usable independent variables"));
    }

    #[test]
    fn fallback_on_failure() {
        let query = Descriptors::Properties(vec![Some(2.5), Some(5.)]);
        let model = LocalModel::new("failing".into(), Arc::new(Failing));
        let neighbors = linear();

        let e = model.aggregate(&neighbors, &query);

        assert!(e.value == weighted_average(&neighbors).value);
        assert!(e.warnings.len() == 1);
        assert!(e.warnings[0].contains("failing"));
    }

    /// Verify that classification falls back to the weighted majority
    /// vote for too few neighbors, missing variables, a single measured
    /// class and a failing trainer.
    #[test]
    fn classification_fallbacks() {
        let query = Descriptors::Properties(vec![Some(0.5), Some(5.)]);
        let ridge = LocalModel::classifier("ridge".into(), Arc::new(RidgeRegression::default()), classes());
        let failing = LocalModel::classifier("failing".into(), Arc::new(Failing), classes());
        let check = |model: &LocalModel, neighbors: &[Neighbor], warning: &str| {
            let e = model.aggregate(neighbors, &query);
            let vote = weighted_majority_vote(neighbors, &classes());
            assert!(e.value == vote.value);
            assert!(e.probabilities == vote.probabilities);
            assert!(e.warnings.len() == 1);
            assert!(e.warnings[0].starts_with(warning));
            assert!(e.warnings[0].ends_with("Using weighted majority vote of similar substances."));
        };

        check(&ridge, &separable()[2..4], "Insufficient number of neighbors (2)");

        let constant = separable().into_iter()
                                  .map(|mut n| {
                                      n.descriptors = Arc::new(Descriptors::Properties(vec![Some(1.), Some(5.)]));
                                      n
                                  })
                                  .collect::<Vec<_>>();
        check(&ridge, &constant, "No usable independent variables");

        check(&ridge, &separable()[..3], "All neighbors have the same measured class.");

        check(&failing, &separable(), "Local model 'failing' failed");
    }

    #[test]
    fn registry() {
        let mut registry = TrainerRegistry::default();
        assert!(registry.names() == vec!["ridge"]);
        assert!(registry.get("svm").is_none());

        registry.register("failing", Arc::new(Failing));
        assert!(registry.names() == vec!["failing", "ridge"]);
        assert!(TrainerRegistry::empty().names().is_empty());
    }
}
