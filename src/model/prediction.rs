//! Predictions and their representation as dataset rows.
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::dataset::{Dataset, Feature, FeatureKind, SubstanceId, Value};
use crate::error::{Error, Result};
use crate::neighbors::Neighbor;

const MEASURED: &str = "measured";

/// How much a prediction can be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    /// The value was measured, not predicted.
    Measured,
    /// Mean neighbor similarity (regression) or probability of the
    /// predicted class (classification).
    Estimated(f64),
    /// No value could be predicted.
    Unavailable,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Confidence::Measured => write!(f, "{}", MEASURED),
            Confidence::Estimated(c) => write!(f, "{}", c),
            Confidence::Unavailable => Ok(()),
        }
    }
}

impl FromStr for Confidence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Confidence> {
        match s {
            "" => Ok(Confidence::Unavailable),
            MEASURED => Ok(Confidence::Measured),
            _ => s.parse::<f64>()
                  .map(Confidence::Estimated)
                  .map_err(|_| Error::bad_request(format!("Invalid confidence '{}'", s))),
        }
    }
}

/// Prediction for one substance.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub substance: SubstanceId,
    pub value: Option<Value>,
    pub confidence: Confidence,
    pub probabilities: Option<IndexMap<String, f64>>,
    pub interval: Option<(f64, f64)>,
    pub warnings: Vec<String>,
    pub neighbors: Vec<Neighbor>,
    /// Measured values of the substance, if known (ground truth in
    /// validations).
    pub measurements: Vec<Value>,
}

impl Prediction {
    /// A prediction without value.
    pub fn unavailable<S: Into<String>>(substance: SubstanceId, warning: S) -> Prediction {
        Prediction {
            substance: substance,
            value: None,
            confidence: Confidence::Unavailable,
            probabilities: None,
            interval: None,
            warnings: vec![warning.into()],
            neighbors: vec![],
            measurements: vec![],
        }
    }

    pub fn is_predicted(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_measured(&self) -> bool {
        self.confidence == Confidence::Measured
    }
}

/// Features a prediction is written to in a result dataset.
#[derive(Debug, Clone)]
pub struct ResultFeatures {
    pub value: Feature,
    pub confidence: Feature,
    pub warnings: Feature,
    /// One probability feature per accepted value (classification).
    pub probabilities: Vec<(String, Feature)>,
}

impl ResultFeatures {
    /// Result features of predictions of `feature`.
    pub fn new(feature: &Feature) -> ResultFeatures {
        let id = &feature.id.0;
        let value = Feature {
            id: format!("{}.prediction", id).as_str().into(),
            name: format!("{} (prediction)", feature.name),
            kind: feature.kind.clone(),
        };
        let probabilities = feature.accept_values()
                                   .unwrap_or(&[])
                                   .iter()
                                   .map(|a| {
                                       let f = Feature::numeric(&format!("{}.probability.{}", id, a),
                                                                format!("{} (probability {})",
                                                                        feature.name, a),
                                                                None);
                                       (a.clone(), f)
                                   })
                                   .collect();

        ResultFeatures {
            value: value,
            confidence: Feature::text(&format!("{}.confidence", id),
                                      format!("{} (confidence)", feature.name)),
            warnings: Feature::text(&format!("{}.warnings", id),
                                    format!("{} (warnings)", feature.name)),
            probabilities: probabilities,
        }
    }

    fn all(&self) -> Vec<&Feature> {
        let mut features = vec![&self.value, &self.confidence, &self.warnings];
        features.extend(self.probabilities.iter().map(|&(_, ref f)| f));
        features
    }

    /// Writes `prediction` to its substance's row of `dataset`.
    ///
    /// The prediction feature always gets an entry, empty when nothing
    /// was predicted, so the row survives serialization.
    pub fn write(&self, dataset: &mut Dataset, prediction: &Prediction) -> Result<()> {
        let id = &prediction.substance;
        for f in self.all() {
            if dataset.feature(&f.id).is_none() {
                dataset.add_feature(f.clone());
            }
        }

        match prediction.value {
            Some(ref v) => dataset.add_value(id, &self.value.id, v.clone())?,
            None => dataset.add_empty(id, &self.value.id)?,
        }
        if prediction.confidence != Confidence::Unavailable {
            dataset.add_value(id, &self.confidence.id,
                              Value::Nominal(prediction.confidence.to_string()))?;
        }
        for w in &prediction.warnings {
            dataset.add_value(id, &self.warnings.id, Value::Nominal(w.clone()))?;
        }
        if let Some(ref probabilities) = prediction.probabilities {
            for &(ref class, ref f) in &self.probabilities {
                if let Some(&p) = probabilities.get(class) {
                    dataset.add_value(id, &f.id, Value::Numeric(p))?;
                }
            }
        }
        Ok(())
    }

    /// Reads back the prediction stored in the row of `substance`.
    ///
    /// Neighbors, intervals and measurements are not part of a result
    /// row and come back empty.
    pub fn read(&self, dataset: &Dataset, substance: &SubstanceId) -> Result<Prediction> {
        if !dataset.has_entry(substance, &self.value.id) {
            return Err(Error::bad_request(format!("No prediction for '{}' in dataset '{}'",
                                                  substance, dataset.name())));
        }

        let value = dataset.values(substance, &self.value.id).first().cloned();
        let confidence = match dataset.values(substance, &self.confidence.id).first() {
            Some(&Value::Nominal(ref c)) => c.parse()?,
            Some(other) => return Err(Error::bad_request(format!("Invalid confidence '{}'", other))),
            None => Confidence::Unavailable,
        };
        let warnings = dataset.values(substance, &self.warnings.id)
                              .iter()
                              .map(|w| w.to_string())
                              .collect();
        let probabilities = if self.probabilities.is_empty()
                               || !self.probabilities.iter().any(|&(_, ref f)| {
                                   !dataset.values(substance, &f.id).is_empty()
                               }) {
            None
        } else {
            Some(self.probabilities
                     .iter()
                     .filter_map(|&(ref class, ref f)| {
                         dataset.values(substance, &f.id)
                                .first()
                                .and_then(Value::as_f64)
                                .map(|p| (class.clone(), p))
                     })
                     .collect())
        };

        Ok(Prediction {
            substance: substance.clone(),
            value: value,
            confidence: confidence,
            probabilities: probabilities,
            interval: None,
            warnings: warnings,
            neighbors: vec![],
            measurements: vec![],
        })
    }
}

/// Copy of `query` with the predictions written to their rows.
///
/// Rows of the result align 1:1 with the substances of `query`.
pub fn result_dataset(query: &Dataset, feature: &Feature, predictions: &[Prediction])
        -> Result<Dataset> {
    let features = ResultFeatures::new(feature);
    let mut result = query.clone();
    result.set_name(format!("{} ({} predictions)", query.name(), feature.name));
    for p in predictions {
        features.write(&mut result, p)?;
    }
    Ok(result)
}

/// Whether a feature can be the target of a model.
pub fn is_predictable(feature: &Feature) -> bool {
    match feature.kind {
        FeatureKind::Nominal { .. } | FeatureKind::Numeric { .. } => true,
        FeatureKind::Text => false,
    }
}
