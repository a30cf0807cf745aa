//! Similarity-based neighbor search.
use std::sync::Arc;

use ordered_float::OrderedFloat;

use crate::config::{DescriptorMethod, SimilarityMethod};
use crate::dataset::{Dataset, FeatureId, Substance, SubstanceId, Value};
use crate::descriptor::{self, DescriptorService, Descriptors};
use crate::error::Result;

/// A training substance that may become a neighbor: its descriptors
/// and its measurements of the prediction feature.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub substance: Substance,
    pub descriptors: Arc<Descriptors>,
    pub measurements: Vec<Value>,
}

impl Candidate {
    /// Collects the substances of `dataset` having at least one value
    /// for `feature`, together with their descriptors.
    ///
    /// Substances whose descriptors cannot be computed are left out and
    /// returned in the second list with the reason.
    pub fn collect(dataset: &Dataset, feature: &FeatureId, method: &DescriptorMethod,
                   service: &dyn DescriptorService)
            -> (Vec<Candidate>, Vec<(SubstanceId, String)>) {
        let mut candidates = vec![];
        let mut failures = vec![];

        for substance in dataset.substances() {
            let measurements = dataset.values(&substance.id, feature);
            if measurements.is_empty() {
                continue;
            }
            match descriptor::calculate(method, service, substance) {
                Ok(d) => candidates.push(Candidate {
                    substance: substance.clone(),
                    descriptors: Arc::new(d),
                    measurements: measurements.to_vec(),
                }),
                Err(e) => failures.push((substance.id.clone(), e.to_string())),
            }
        }

        (candidates, failures)
    }
}

/// A training substance similar to a query substance.
///
/// Neighbors only live within a single prediction.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub substance: SubstanceId,
    pub similarity: f64,
    pub measurements: Vec<Value>,
    pub descriptors: Arc<Descriptors>,
}

/// Finds the candidates at least `min_similarity` similar to a query.
#[derive(Debug, Clone)]
pub struct NeighborFinder {
    similarity: SimilarityMethod,
    min_similarity: f64,
    weights: Option<Vec<f64>>,
}

impl NeighborFinder {
    pub fn new(similarity: SimilarityMethod, min_similarity: f64) -> NeighborFinder {
        NeighborFinder {
            similarity: similarity,
            min_similarity: min_similarity,
            weights: None,
        }
    }

    /// Sets the descriptor weights used by the weighted cosine.
    pub fn with_weights(mut self, weights: Vec<f64>) -> NeighborFinder {
        self.weights = Some(weights);
        self
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    /// Same finder with another similarity threshold.
    pub fn with_min_similarity(&self, min_similarity: f64) -> NeighborFinder {
        NeighborFinder {
            min_similarity: min_similarity,
            ..self.clone()
        }
    }

    /// Returns the neighbors of `query` among `candidates`, sorted by
    /// decreasing similarity (ties keep the candidates' order).
    ///
    /// The query itself is never its own neighbor, candidates without
    /// measurements are ignored, and a query with a structural core only
    /// accepts candidates with the same core. Candidates that cannot be
    /// compared with the query are skipped.
    pub fn find(&self, query: &Substance, query_descriptors: &Descriptors,
                candidates: &[Candidate]) -> Vec<Neighbor> {
        let weights = self.weights.as_ref().map(|w| w.as_slice());

        let mut neighbors = candidates.iter()
            .filter(|c| c.substance.id != query.id)
            .filter(|c| !c.measurements.is_empty())
            .filter(|c| same_core(query, &c.substance))
            .filter_map(|c| {
                match self.similarity.similarity(query_descriptors, &c.descriptors, weights) {
                    Ok(sim) if sim >= self.min_similarity => Some(Neighbor {
                        substance: c.substance.id.clone(),
                        similarity: sim,
                        measurements: c.measurements.clone(),
                        descriptors: c.descriptors.clone(),
                    }),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("{} not compared with {}: {}", c.substance.id, query.id, e);
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        neighbors.sort_by(|a, b| OrderedFloat(b.similarity).cmp(&OrderedFloat(a.similarity)));
        neighbors
    }

    /// Neighbors of `query` in a whole dataset.
    ///
    /// Computes the query's descriptors once, then scans every substance
    /// of `dataset` with values for `feature`.
    ///
    /// # Errors
    ///
    /// `Error::Descriptor` if the query's descriptors cannot be computed.
    pub fn search(&self, query: &Substance, dataset: &Dataset, feature: &FeatureId,
                  method: &DescriptorMethod, service: &dyn DescriptorService)
            -> Result<Vec<Neighbor>> {
        let query_descriptors = descriptor::calculate(method, service, query)?;
        let (candidates, failures) = Candidate::collect(dataset, feature, method, service);
        for (id, reason) in failures {
            debug!("{} skipped as candidate: {}", id, reason);
        }
        Ok(self.find(query, &query_descriptors, &candidates))
    }
}

fn same_core(query: &Substance, candidate: &Substance) -> bool {
    match query.core {
        Some(ref core) => candidate.core.as_ref() == Some(core),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Feature;
    use crate::descriptor::DescriptorTable;

    fn candidate(substance: Substance, tokens: &[&str], value: f64) -> Candidate {
        Candidate {
            substance: substance,
            descriptors: Arc::new(Descriptors::Fingerprint(tokens.iter()
                                                                 .map(|t| t.to_string())
                                                                 .collect())),
            measurements: vec![Value::Numeric(value)],
        }
    }

    fn fingerprint(tokens: &[&str]) -> Descriptors {
        Descriptors::Fingerprint(tokens.iter().map(|t| t.to_string()).collect())
    }

    /// Verify threshold filtering and the ordering of neighbors.
    #[test]
    fn find() {
        let candidates = vec![candidate(Substance::new("c1"), &["A", "C"], 1.),
                              candidate(Substance::new("c2"), &["A", "B"], 2.),
                              candidate(Substance::new("c3"), &["D"], 3.),
                              candidate(Substance::new("c4"), &["A", "D"], 4.)];
        let finder = NeighborFinder::new(SimilarityMethod::Tanimoto, 0.3);
        let query = Substance::new("q");

        let neighbors = finder.find(&query, &fingerprint(&["A", "B"]), &candidates);
        let ids = neighbors.iter().map(|n| n.substance.0.as_str()).collect::<Vec<_>>();
        let sims = neighbors.iter().map(|n| n.similarity).collect::<Vec<_>>();

        assert!(ids == vec!["c2", "c1", "c4"]);
        assert!(sims == vec![1., 1. / 3., 1. / 3.]);
    }

    #[test]
    fn excludes_query() {
        let candidates = vec![candidate(Substance::new("q"), &["A"], 1.),
                              candidate(Substance::new("c1"), &["A"], 2.)];
        let finder = NeighborFinder::new(SimilarityMethod::Tanimoto, 0.);

        let neighbors = finder.find(&Substance::new("q"), &fingerprint(&["A"]), &candidates);

        assert!(neighbors.len() == 1);
        assert!(neighbors[0].substance == SubstanceId::from("c1"));
    }

    /// Verify that candidates with a different core are not neighbors of
    /// a composite query substance.
    #[test]
    fn core_must_match() {
        let candidates = vec![candidate(Substance::with_core("np1", "Au"), &["A"], 1.),
                              candidate(Substance::with_core("np2", "Ag"), &["A"], 2.),
                              candidate(Substance::new("c1"), &["A"], 3.)];
        let finder = NeighborFinder::new(SimilarityMethod::Tanimoto, 0.5);

        let composite = finder.find(&Substance::with_core("q", "Au"), &fingerprint(&["A"]),
                                    &candidates);
        assert!(composite.len() == 1);
        assert!(composite[0].substance == SubstanceId::from("np1"));

        let plain = finder.find(&Substance::new("q"), &fingerprint(&["A"]), &candidates);
        assert!(plain.len() == 3);
    }

    #[test]
    fn empty_neighborhood() {
        let candidates = vec![candidate(Substance::new("c1"), &["X"], 1.)];
        let finder = NeighborFinder::new(SimilarityMethod::Tanimoto, 0.5);

        assert!(finder.find(&Substance::new("q"), &fingerprint(&["A"]), &candidates).is_empty());
    }

    /// Verify that a dataset search ignores substances without values
    /// and substances without descriptors.
    #[test]
    fn search() {
        let feature = Feature::numeric("logc", "log concentration", None);
        let mut ds = Dataset::new("train");
        ds.add_feature(feature.clone());
        let mut table = DescriptorTable::new();
        for (id, tokens) in vec![("c1", vec!["A", "B"]), ("c2", vec!["A"]), ("c3", vec![])] {
            let s = Substance::new(id);
            table.add_fingerprint(&s.id, "MP2D", tokens);
            ds.add_substance(s);
        }
        table.add_fingerprint(&SubstanceId::from("q"), "MP2D", vec!["A", "B"]);
        ds.add_value(&SubstanceId::from("c1"), &feature.id, Value::Numeric(1.)).unwrap();
        ds.add_value(&SubstanceId::from("c3"), &feature.id, Value::Numeric(3.)).unwrap();

        let method = DescriptorMethod::Fingerprint { kind: "MP2D".into() };
        let finder = NeighborFinder::new(SimilarityMethod::Tanimoto, 0.);
        let neighbors = finder.search(&Substance::new("q"), &ds, &feature.id, &method, &table)
                              .unwrap();

        assert!(neighbors.len() == 1);
        assert!(neighbors[0].substance == SubstanceId::from("c1"));
        assert!(finder.search(&Substance::new("unknown"), &ds, &feature.id, &method, &table)
                      .is_err());
    }
}
