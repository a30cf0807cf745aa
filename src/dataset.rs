//! Substances, features and sparse list-valued datasets.
//!
//! A `Dataset` maps `(substance, feature)` pairs to a *list* of values:
//! independent measurements of the same property may disagree, and all of
//! them are kept.
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::error::{Error, Result};

/// Opaque substance identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubstanceId(pub String);

impl fmt::Display for SubstanceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> From<&'a str> for SubstanceId {
    fn from(id: &'a str) -> SubstanceId {
        SubstanceId(id.to_string())
    }
}

impl From<String> for SubstanceId {
    fn from(id: String) -> SubstanceId {
        SubstanceId(id)
    }
}

/// Feature identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub String);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> From<&'a str> for FeatureId {
    fn from(id: &'a str) -> FeatureId {
        FeatureId(id.to_string())
    }
}

/// A substance.
///
/// Composite substances (e.g., nanoparticles) carry the identity of
/// their structural `core`; neighbors with a different core are never
/// used for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Substance {
    pub id: SubstanceId,
    pub core: Option<String>,
}

impl Substance {
    pub fn new<S: Into<String>>(id: S) -> Substance {
        Substance {
            id: SubstanceId(id.into()),
            core: None,
        }
    }

    pub fn with_core<S: Into<String>, C: Into<String>>(id: S, core: C) -> Substance {
        Substance {
            id: SubstanceId(id.into()),
            core: Some(core.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Categorical feature with an ordered, fixed set of accepted values.
    Nominal { accept_values: Vec<String> },
    Numeric { unit: Option<String> },
    /// Free text, e.g. warnings attached to predictions.
    Text,
}

/// A measured or predicted property.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
    pub kind: FeatureKind,
}

impl Feature {
    pub fn nominal<S: Into<String>>(id: &str, name: S, accept_values: &[&str]) -> Feature {
        Feature {
            id: FeatureId::from(id),
            name: name.into(),
            kind: FeatureKind::Nominal {
                accept_values: accept_values.iter().map(|v| v.to_string()).collect(),
            },
        }
    }

    pub fn numeric<S: Into<String>>(id: &str, name: S, unit: Option<&str>) -> Feature {
        Feature {
            id: FeatureId::from(id),
            name: name.into(),
            kind: FeatureKind::Numeric {
                unit: unit.map(|u| u.to_string()),
            },
        }
    }

    pub fn text<S: Into<String>>(id: &str, name: S) -> Feature {
        Feature {
            id: FeatureId::from(id),
            name: name.into(),
            kind: FeatureKind::Text,
        }
    }

    pub fn is_nominal(&self) -> bool {
        match self.kind {
            FeatureKind::Nominal { .. } => true,
            _ => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        match self.kind {
            FeatureKind::Numeric { .. } => true,
            _ => false,
        }
    }

    /// Accepted values of a nominal feature, `None` for numeric ones.
    pub fn accept_values(&self) -> Option<&[String]> {
        match self.kind {
            FeatureKind::Nominal { ref accept_values } => Some(accept_values),
            _ => None,
        }
    }

    /// True if `value` has the right type for this feature (and, for
    /// nominal features, is one of the accepted values).
    pub fn accepts(&self, value: &Value) -> bool {
        match (&self.kind, value) {
            (&FeatureKind::Nominal { ref accept_values }, &Value::Nominal(ref v)) => {
                accept_values.iter().any(|a| a == v)
            }
            (&FeatureKind::Numeric { .. }, &Value::Numeric(_)) => true,
            (&FeatureKind::Text, &Value::Nominal(_)) => true,
            _ => false,
        }
    }
}

/// A single observed or predicted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Nominal(String),
    Numeric(f64),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Numeric(v) => Some(v),
            Value::Nominal(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Nominal(ref v) => Some(v),
            Value::Numeric(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Nominal(ref v) => write!(f, "{}", v),
            Value::Numeric(v) => write!(f, "{}", v),
        }
    }
}

/// Median of a list of numbers; NaNs are ignored.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.iter()
                           .cloned()
                           .filter(|v| !v.is_nan())
                           .map(OrderedFloat)
                           .collect::<Vec<_>>();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort();
    let n = sorted.len();
    let m = if n % 2 == 1 {
        sorted[n / 2].0
    } else {
        (sorted[n / 2 - 1].0 + sorted[n / 2].0) / 2.
    };
    Some(m)
}

/// Single representative of a list of measurements: the median of
/// numeric values, or the most frequent nominal value (the first one
/// encountered wins a tie).
pub fn representative(values: &[Value]) -> Option<Value> {
    let numbers = values.iter().filter_map(Value::as_f64).collect::<Vec<_>>();
    if !numbers.is_empty() {
        return median(&numbers).map(Value::Numeric);
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for v in values.iter().filter_map(Value::as_str) {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (v, &c) in counts.iter() {
        match best {
            Some((_, b)) if b >= c => {}
            _ => best = Some((*v, c)),
        }
    }
    best.map(|(v, _)| Value::Nominal(v.to_string()))
}

/// Sparse mapping from (substance, feature) to a list of values.
///
/// Substances keep their insertion order, which is also the row order
/// of datasets derived from this one.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    name: String,
    substances: Vec<Substance>,
    index: HashMap<SubstanceId, usize>,
    features: Vec<Feature>,
    data: HashMap<(SubstanceId, FeatureId), Vec<Value>>,
}

impl Dataset {
    pub fn new<S: Into<String>>(name: S) -> Dataset {
        Dataset {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Adds a feature, replacing a previous one with the same id.
    pub fn add_feature(&mut self, feature: Feature) {
        match self.features.iter().position(|f| f.id == feature.id) {
            Some(i) => self.features[i] = feature,
            None => self.features.push(feature),
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == *id)
    }

    /// Adds a substance. Returns `false` (and leaves the dataset
    /// untouched) if a substance with the same id is already present.
    pub fn add_substance(&mut self, substance: Substance) -> bool {
        if self.index.contains_key(&substance.id) {
            return false;
        }
        self.index.insert(substance.id.clone(), self.substances.len());
        self.substances.push(substance);
        true
    }

    pub fn substances(&self) -> &[Substance] {
        &self.substances
    }

    pub fn substance(&self, id: &SubstanceId) -> Option<&Substance> {
        self.index.get(id).map(|&i| &self.substances[i])
    }

    pub fn contains(&self, id: &SubstanceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    /// Appends a value to the list recorded for `(substance, feature)`.
    ///
    /// # Errors
    ///
    /// `BadRequest` if the substance or the feature are unknown, or if
    /// the value is not accepted by the feature.
    pub fn add_value(&mut self, substance: &SubstanceId, feature: &FeatureId, value: Value)
            -> Result<()> {
        {
            let f = self.check(substance, feature)?;
            if !f.accepts(&value) {
                return Err(Error::bad_request(format!("Value '{}' is not accepted by feature '{}'",
                                                      value, f.name)));
            }
        }
        self.data.entry((substance.clone(), feature.clone()))
                 .or_insert_with(Vec::new)
                 .push(value);
        Ok(())
    }

    /// Records an empty value list for `(substance, feature)` unless one
    /// exists already, so the substance keeps its row.
    pub fn add_empty(&mut self, substance: &SubstanceId, feature: &FeatureId) -> Result<()> {
        self.check(substance, feature)?;
        self.data.entry((substance.clone(), feature.clone()))
                 .or_insert_with(Vec::new);
        Ok(())
    }

    /// Values recorded for `(substance, feature)`; empty if none.
    pub fn values(&self, substance: &SubstanceId, feature: &FeatureId) -> &[Value] {
        self.data.get(&(substance.clone(), feature.clone()))
                 .map(|v| v.as_slice())
                 .unwrap_or(&[])
    }

    /// True if an entry (possibly empty) exists for `(substance, feature)`.
    pub fn has_entry(&self, substance: &SubstanceId, feature: &FeatureId) -> bool {
        self.data.contains_key(&(substance.clone(), feature.clone()))
    }

    /// New dataset with the given substances (in the given order) and
    /// all their values. Unknown ids are ignored.
    pub fn subset<S: Into<String>>(&self, name: S, ids: &[SubstanceId]) -> Dataset {
        let mut subset = Dataset::new(name);
        for f in &self.features {
            subset.add_feature(f.clone());
        }
        for id in ids {
            if let Some(s) = self.substance(id) {
                subset.add_substance(s.clone());
                for f in &self.features {
                    if let Some(values) = self.data.get(&(id.clone(), f.id.clone())) {
                        subset.data.insert((id.clone(), f.id.clone()), values.clone());
                    }
                }
            }
        }
        subset
    }

    fn check(&self, substance: &SubstanceId, feature: &FeatureId) -> Result<&Feature> {
        if !self.contains(substance) {
            return Err(Error::bad_request(format!("Unknown substance '{}' in dataset '{}'",
                                                  substance, self.name)));
        }
        self.feature(feature)
            .ok_or_else(|| Error::bad_request(format!("Unknown feature '{}' in dataset '{}'",
                                                      feature, self.name)))
    }
}
