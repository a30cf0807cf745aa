//! The read-across crate.
//!
//! A crate implementing lazy learning ("read-across") prediction of
//! substance properties: instead of fitting one global model, the
//! property of a query substance is predicted from the measured values
//! of the most similar training substances (its neighbors).
//!
//! # Overview
//! * Similarity functions over fingerprints and property vectors
//!   ([similarity](similarity/index.html)).
//! * Neighbor search ([neighbors](neighbors/index.html)).
//! * Aggregation of neighbor measurements: weighted majority vote,
//!   weighted average, and local models fitted on the neighbors
//!   ([aggregate](aggregate/index.html)).
//! * Models binding a training dataset, a prediction feature and a
//!   configuration ([model](model/index.html)).
//! * Train/test, k-fold, leave-one-out and repeated cross-validation
//!   with their statistics ([validation](validation/index.html)).
//!
//! Descriptor computation is outside this crate: substances are
//! described through a `DescriptorService`.
//!
//! # Examples
//!
//! Predict a continuous property from two training substances, both
//! with Tanimoto similarity 0.5 to the query.
//!
//! ```
//! extern crate read_across;
//!
//! # fn main() {
//! use std::sync::Arc;
//! use read_across::*;
//!
//! let feature = Feature::numeric("logc", "log concentration", None);
//! let mut training = Dataset::new("training");
//! training.add_feature(feature.clone());
//! let mut descriptors = DescriptorTable::new();
//!
//! for &(id, ref tokens, y) in &[("c1", vec!["A", "B"], 1.), ("c2", vec!["A", "C"], 3.)] {
//!     let s = Substance::new(id);
//!     descriptors.add_fingerprint(&s.id, "MP2D", tokens.clone());
//!     training.add_substance(s.clone());
//!     training.add_value(&s.id, &feature.id, Value::Numeric(y))
//!             .expect("Failed to add value");
//! }
//! descriptors.add_fingerprint(&SubstanceId::from("q"), "MP2D", vec!["A"]);
//!
//! let context = Context::new(Arc::new(descriptors));
//! let mut config = Config::default();
//! config.min_similarity = Some(0.);
//! let model = Model::create(&training, &feature.id, &config, &context)
//!                   .expect("Failed to create model");
//!
//! match model.predict(&Query::Substance(Substance::new("q"))) {
//!     Ok(PredictionOutput::Single(p)) => assert!(p.value == Some(Value::Numeric(2.))),
//!     _ => panic!("Failed to predict"),
//! }
//! # }
//! ```

extern crate rand;
extern crate rayon;
extern crate pcg_rand;
extern crate itertools;
extern crate rusty_machine;
extern crate ordered_float;
extern crate statrs;
extern crate csv;
extern crate serde;
extern crate serde_json;
extern crate thiserror;
extern crate indexmap;
extern crate parking_lot;
extern crate chrono;
#[cfg_attr(test, macro_use)]
extern crate ndarray;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod neighbors;
pub mod observer;
pub mod selection;
pub mod similarity;
pub mod utils;
pub mod validation;

pub use crate::config::{AggregationMethod, Algorithms, Config, Context, DescriptorMethod,
                        FeatureSelection, ModelKind, SimilarityMethod};
pub use crate::dataset::{Dataset, Feature, FeatureId, Substance, SubstanceId, Value};
pub use crate::descriptor::{CachedDescriptors, DescriptorService, DescriptorTable, Descriptors};
pub use crate::error::{Error, Result};
pub use crate::model::{Confidence, Mode, Model, Prediction, PredictionOutput, Query};
pub use crate::observer::{LogObserver, Observer, SilentObserver};
pub use crate::validation::{CrossValidation, LeaveOneOut, RepeatedCrossValidation, TrainTest,
                            Validation};
