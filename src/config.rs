//! Model configuration.
//!
//! A `Config` is what callers provide: every field is optional.
//! `Config::resolve()` fills in defaults once, checks that the chosen
//! methods fit together, and returns the immutable `Algorithms` a model
//! is built with.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::aggregate::TrainerRegistry;
use crate::descriptor::DescriptorService;
use crate::error::{Error, Result};
use crate::observer::{LogObserver, Observer};

/// Fingerprint type used when none is configured.
pub const DEFAULT_FINGERPRINT: &str = "MP2D";
/// Similarity threshold used when none is configured.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Classification,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    Tanimoto,
    Cosine,
    WeightedCosine,
    Euclidean,
}

const SIMILARITY_METHODS: &[(&str, SimilarityMethod)] = &[
    ("tanimoto", SimilarityMethod::Tanimoto),
    ("cosine", SimilarityMethod::Cosine),
    ("weighted_cosine", SimilarityMethod::WeightedCosine),
    ("euclidean", SimilarityMethod::Euclidean),
];

impl SimilarityMethod {
    /// True if the method compares fingerprint sets rather than
    /// property vectors.
    pub fn is_set_based(&self) -> bool {
        *self == SimilarityMethod::Tanimoto
    }
}

impl FromStr for SimilarityMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<SimilarityMethod> {
        SIMILARITY_METHODS.iter()
                          .find(|&&(name, _)| name == s)
                          .map(|&(_, m)| m)
                          .ok_or_else(|| Error::bad_request(format!("Unknown similarity method '{}'", s)))
    }
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = SIMILARITY_METHODS.iter()
                                     .find(|&&(_, m)| m == *self)
                                     .map(|&(name, _)| name)
                                     .unwrap_or("unknown");
        write!(f, "{}", name)
    }
}

/// How neighbor measurements are turned into a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    WeightedMajorityVote,
    WeightedAverage,
    /// A local model fitted on the neighbors by the named trainer of
    /// the `TrainerRegistry`.
    LocalModel(String),
}

const LOCAL_PREFIX: &str = "local:";

impl FromStr for AggregationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<AggregationMethod> {
        match s {
            "weighted_majority_vote" => Ok(AggregationMethod::WeightedMajorityVote),
            "weighted_average" => Ok(AggregationMethod::WeightedAverage),
            _ if s.starts_with(LOCAL_PREFIX) && s.len() > LOCAL_PREFIX.len() => {
                Ok(AggregationMethod::LocalModel(s[LOCAL_PREFIX.len()..].to_string()))
            }
            _ => Err(Error::bad_request(format!("Unknown aggregation method '{}'", s))),
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AggregationMethod::WeightedMajorityVote => write!(f, "weighted_majority_vote"),
            AggregationMethod::WeightedAverage => write!(f, "weighted_average"),
            AggregationMethod::LocalModel(ref name) => write!(f, "{}{}", LOCAL_PREFIX, name),
        }
    }
}

/// Which descriptors represent a substance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum DescriptorMethod {
    Fingerprint { kind: String },
    Properties { names: Vec<String> },
}

impl DescriptorMethod {
    pub fn is_fingerprint(&self) -> bool {
        match *self {
            DescriptorMethod::Fingerprint { .. } => true,
            DescriptorMethod::Properties { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Keep property descriptors significantly correlated with the
    /// prediction feature, weighted by their squared correlation.
    CorrelationFilter,
}

/// Caller-provided model configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub descriptors: Option<DescriptorMethod>,
    pub similarity: Option<SimilarityMethod>,
    pub min_similarity: Option<f64>,
    /// Lower threshold tried when a prediction at `min_similarity` has
    /// warnings.
    pub retry_min_similarity: Option<f64>,
    pub aggregation: Option<AggregationMethod>,
    pub feature_selection: Option<FeatureSelection>,
    /// Seed for fold shuffling in validations.
    pub seed: Option<u64>,
}

/// Fully resolved, immutable model configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Algorithms {
    pub descriptors: DescriptorMethod,
    pub similarity: SimilarityMethod,
    pub min_similarity: f64,
    /// Only set when below `min_similarity`.
    pub retry_min_similarity: Option<f64>,
    pub aggregation: AggregationMethod,
    pub feature_selection: Option<FeatureSelection>,
}

impl Config {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Config> {
        Ok(serde_json::from_str(json)?)
    }

    /// Seed in the format of the fold shuffling PRNG.
    pub fn seed(&self) -> Option<[u64; 2]> {
        self.seed.map(|s| [0, s])
    }

    /// Applies defaults and checks the configuration for a model of
    /// the given kind.
    pub fn resolve(&self, kind: ModelKind) -> Result<Algorithms> {
        let descriptors = self.descriptors.clone().unwrap_or_else(|| {
            DescriptorMethod::Fingerprint { kind: DEFAULT_FINGERPRINT.to_string() }
        });

        let similarity = match self.similarity {
            Some(s) => s,
            None if descriptors.is_fingerprint() => SimilarityMethod::Tanimoto,
            None if self.feature_selection.is_some() => SimilarityMethod::WeightedCosine,
            None => SimilarityMethod::Cosine,
        };
        if similarity.is_set_based() != descriptors.is_fingerprint() {
            return Err(Error::bad_request(format!("Similarity method '{}' cannot compare {} descriptors",
                                                  similarity,
                                                  if descriptors.is_fingerprint() { "fingerprint" }
                                                  else { "property" })));
        }
        if let DescriptorMethod::Properties { ref names } = descriptors {
            if names.is_empty() {
                return Err(Error::bad_request("No property descriptors configured"));
            }
        }

        let min_similarity = self.min_similarity.unwrap_or(DEFAULT_MIN_SIMILARITY);
        if !(min_similarity >= 0. && min_similarity <= 1.) {
            return Err(Error::bad_request(format!("Similarity threshold {} is not in [0,1]",
                                                  min_similarity)));
        }
        let retry_min_similarity = match self.retry_min_similarity {
            Some(t) if !(t >= 0. && t <= 1.) => {
                return Err(Error::bad_request(format!("Similarity threshold {} is not in [0,1]", t)));
            }
            Some(t) if t < min_similarity => Some(t),
            _ => None,
        };

        let aggregation = match self.aggregation.clone() {
            None if kind == ModelKind::Classification => AggregationMethod::WeightedMajorityVote,
            None => AggregationMethod::WeightedAverage,
            Some(a) => {
                let fits = match (&a, kind) {
                    (&AggregationMethod::WeightedMajorityVote, ModelKind::Classification) => true,
                    (&AggregationMethod::WeightedAverage, ModelKind::Regression) => true,
                    (&AggregationMethod::LocalModel(_), _) => true,
                    _ => false,
                };
                if !fits {
                    return Err(Error::bad_request(format!("Aggregation method '{}' cannot be used for {:?}",
                                                          a, kind)));
                }
                a
            }
        };

        if self.feature_selection.is_some() && descriptors.is_fingerprint() {
            return Err(Error::bad_request("Feature selection requires property descriptors"));
        }
        if self.feature_selection.is_some() && kind == ModelKind::Classification {
            return Err(Error::bad_request("Feature selection requires a numeric prediction feature"));
        }

        Ok(Algorithms {
            descriptors: descriptors,
            similarity: similarity,
            min_similarity: min_similarity,
            retry_min_similarity: retry_min_similarity,
            aggregation: aggregation,
            feature_selection: self.feature_selection,
        })
    }
}

/// Runtime collaborators shared by models and validations.
#[derive(Clone)]
pub struct Context {
    pub descriptors: Arc<dyn DescriptorService>,
    pub trainers: TrainerRegistry,
    pub observer: Arc<dyn Observer>,
}

impl Context {
    /// Context with the default trainers, reporting to the `log` facade.
    pub fn new(descriptors: Arc<dyn DescriptorService>) -> Context {
        Context {
            descriptors: descriptors,
            trainers: TrainerRegistry::default(),
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Context {
        self.observer = observer;
        self
    }

    pub fn with_trainers(mut self, trainers: TrainerRegistry) -> Context {
        self.trainers = trainers;
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Context {{ trainers: {:?} }}", self.trainers.names())
    }
}
