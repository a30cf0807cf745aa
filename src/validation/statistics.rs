//! Validation statistics.
use std::fmt;

use indexmap::IndexMap;
use ndarray::prelude::*;

use crate::dataset::{median, Feature, SubstanceId, Value};
use crate::model::Prediction;
use crate::selection::pearson;

/// Statistics of a classification validation.
///
/// Rows of the confusion matrices are predicted classes, columns are
/// measured classes, both in the order of the feature's accepted values.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationStatistics {
    pub accept_values: Vec<String>,
    pub confusion_matrix: Array2<usize>,
    /// Like `confusion_matrix`, but every prediction adds its class
    /// probability instead of 1.
    pub weighted_confusion_matrix: Array2<f64>,
    /// Predictions counted in the confusion matrix.
    pub nr_instances: usize,
    pub accuracy: Option<f64>,
    pub weighted_accuracy: Option<f64>,
    /// Per class: diagonal over row sum (predicted as the class).
    pub true_rate: IndexMap<String, Option<f64>>,
    /// Per class: diagonal over column sum (measured as the class).
    pub predictivity: IndexMap<String, Option<f64>>,
}

/// Statistics of a regression validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionStatistics {
    /// Predictions with a value and at least one measurement.
    pub nr_instances: usize,
    /// Predictions with a value but without measurements.
    pub nr_unmeasured: usize,
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub r_squared: Option<f64>,
    pub within_prediction_interval: usize,
    pub out_of_prediction_interval: usize,
}

impl RegressionStatistics {
    /// Share of predictions with an interval whose measured median lies
    /// inside the interval.
    pub fn coverage(&self) -> Option<f64> {
        let n = self.within_prediction_interval + self.out_of_prediction_interval;
        if n == 0 {
            None
        } else {
            Some(self.within_prediction_interval as f64 / n as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    Classification(ClassificationStatistics),
    Regression(RegressionStatistics),
}

impl Statistics {
    /// Statistics of `predictions` of `feature`, plus a warning for
    /// every regression prediction without measurements.
    pub fn compute<'a, I>(feature: &Feature, predictions: I) -> (Statistics, Vec<String>)
            where I: IntoIterator<Item = &'a Prediction> {
        match feature.accept_values() {
            Some(accept_values) => (Statistics::Classification(classification(predictions, accept_values)),
                                    vec![]),
            None => {
                let (stats, unmeasured) = regression(predictions);
                let warnings = unmeasured.iter()
                                         .map(|id| format!("No measurements for '{}', prediction not scored.", id))
                                         .collect();
                (Statistics::Regression(stats), warnings)
            }
        }
    }

    pub fn as_classification(&self) -> Option<&ClassificationStatistics> {
        match *self {
            Statistics::Classification(ref s) => Some(s),
            Statistics::Regression(_) => None,
        }
    }

    pub fn as_regression(&self) -> Option<&RegressionStatistics> {
        match *self {
            Statistics::Regression(ref s) => Some(s),
            Statistics::Classification(_) => None,
        }
    }
}

fn fmt_metric(x: Option<f64>) -> String {
    x.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Statistics::Classification(ref s) => {
                writeln!(f, "instances: {}", s.nr_instances)?;
                writeln!(f, "accuracy: {}", fmt_metric(s.accuracy))?;
                writeln!(f, "weighted accuracy: {}", fmt_metric(s.weighted_accuracy))?;
                for class in &s.accept_values {
                    writeln!(f, "{}: true rate {}, predictivity {}", class,
                             fmt_metric(s.true_rate.get(class).cloned().unwrap_or(None)),
                             fmt_metric(s.predictivity.get(class).cloned().unwrap_or(None)))?;
                }
                write!(f, "confusion matrix (predicted x measured):\n{}", s.confusion_matrix)
            }
            Statistics::Regression(ref s) => {
                writeln!(f, "instances: {} ({} unmeasured)", s.nr_instances, s.nr_unmeasured)?;
                writeln!(f, "rmse: {}", fmt_metric(s.rmse))?;
                writeln!(f, "mae: {}", fmt_metric(s.mae))?;
                writeln!(f, "r^2: {}", fmt_metric(s.r_squared))?;
                write!(f, "interval coverage: {} ({} within, {} out)", fmt_metric(s.coverage()),
                       s.within_prediction_interval, s.out_of_prediction_interval)
            }
        }
    }
}

fn ratio(a: f64, b: f64) -> Option<f64> {
    if b > 0. {
        Some(a / b)
    } else {
        None
    }
}

/// Confusion matrices and derived metrics.
///
/// Only predictions with a value and an unambiguous measured class
/// (all measurements equal) are counted.
pub fn classification<'a, I>(predictions: I, accept_values: &[String]) -> ClassificationStatistics
        where I: IntoIterator<Item = &'a Prediction> {
    let k = accept_values.len();
    let index = |v: &str| accept_values.iter().position(|a| a == v);

    let mut confusion_matrix = Array2::<usize>::zeros((k, k));
    let mut weighted_confusion_matrix = Array2::<f64>::zeros((k, k));
    let mut nr_instances = 0;

    for p in predictions {
        let predicted = match p.value.as_ref().and_then(Value::as_str).and_then(|v| index(v)) {
            Some(i) => i,
            None => continue,
        };
        let mut measured = p.measurements.iter().filter_map(Value::as_str);
        let first = match measured.next() {
            Some(m) => m,
            None => continue,
        };
        if measured.any(|m| m != first) {
            continue;
        }
        let truth = match index(first) {
            Some(j) => j,
            None => continue,
        };
        let probability = p.probabilities
                           .as_ref()
                           .and_then(|probabilities| probabilities.get(&accept_values[predicted]))
                           .cloned()
                           .unwrap_or(0.);

        confusion_matrix[[predicted, truth]] += 1;
        weighted_confusion_matrix[[predicted, truth]] += probability;
        nr_instances += 1;
    }

    let mut true_rate = IndexMap::new();
    let mut predictivity = IndexMap::new();
    for (i, a) in accept_values.iter().enumerate() {
        let hits = confusion_matrix[[i, i]] as f64;
        true_rate.insert(a.clone(), ratio(hits, confusion_matrix.row(i).scalar_sum() as f64));
        predictivity.insert(a.clone(), ratio(hits, confusion_matrix.column(i).scalar_sum() as f64));
    }

    let accuracy = ratio(confusion_matrix.diag().scalar_sum() as f64, nr_instances as f64);
    let weighted_accuracy = ratio(weighted_confusion_matrix.diag().scalar_sum(),
                                  weighted_confusion_matrix.scalar_sum());

    ClassificationStatistics {
        accept_values: accept_values.to_vec(),
        confusion_matrix: confusion_matrix,
        weighted_confusion_matrix: weighted_confusion_matrix,
        nr_instances: nr_instances,
        accuracy: accuracy,
        weighted_accuracy: weighted_accuracy,
        true_rate: true_rate,
        predictivity: predictivity,
    }
}

/// Error statistics against the median of the measurements.
///
/// Also returns the substances predicted without measurements.
pub fn regression<'a, I>(predictions: I) -> (RegressionStatistics, Vec<SubstanceId>)
        where I: IntoIterator<Item = &'a Prediction> {
    let mut pairs = vec![];
    let mut unmeasured = vec![];
    let mut within = 0;
    let mut out = 0;

    for p in predictions {
        let predicted = match p.value.as_ref().and_then(Value::as_f64) {
            Some(v) => v,
            None => continue,
        };
        let measured = p.measurements.iter().filter_map(Value::as_f64).collect::<Vec<_>>();
        let truth = match median(&measured) {
            Some(m) => m,
            None => {
                unmeasured.push(p.substance.clone());
                continue;
            }
        };
        if let Some((lo, hi)) = p.interval {
            if lo <= truth && truth <= hi {
                within += 1;
            } else {
                out += 1;
            }
        }
        pairs.push((predicted, truth));
    }

    let n = pairs.len() as f64;
    let sq_error = pairs.iter().map(|&(p, m)| (p - m).powi(2)).sum::<f64>();
    let abs_error = pairs.iter().map(|&(p, m)| (p - m).abs()).sum::<f64>();

    let stats = RegressionStatistics {
        nr_instances: pairs.len(),
        nr_unmeasured: unmeasured.len(),
        rmse: ratio(sq_error, n).map(f64::sqrt),
        mae: ratio(abs_error, n),
        r_squared: pearson(&pairs).map(|r| r * r),
        within_prediction_interval: within,
        out_of_prediction_interval: out,
    };
    (stats, unmeasured)
}
