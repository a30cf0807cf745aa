//! Similarity functions.
//!
//! Vector functions skip positions where either input (or the weight)
//! is missing, and fail with `Error::NoOverlap` only if nothing is left.
use std::collections::BTreeSet;

use crate::config::SimilarityMethod;
use crate::descriptor::Descriptors;
use crate::error::{Error, Result};

/// Tanimoto (Jaccard) similarity of two sets: `|a ∩ b| / |a ∪ b|`.
pub fn tanimoto<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> Result<f64> {
    if a.is_empty() && b.is_empty() {
        return Err(Error::EmptyInput);
    }
    let common = a.intersection(b).count();
    let all = a.len() + b.len() - common;
    Ok(common as f64 / all as f64)
}

/// Euclidean distance between the overlapping parts of two vectors.
pub fn euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> Result<f64> {
    let dist = overlap(a, b)?.iter()
                             .map(|&(x, y)| (x - y).powi(2))
                             .sum::<f64>()
                             .sqrt();
    Ok(dist)
}

/// Cosine of the angle between the overlapping parts of two vectors.
pub fn cosine(a: &[Option<f64>], b: &[Option<f64>]) -> Result<f64> {
    let pairs = overlap(a, b)?;
    let weights = vec![1.; pairs.len()];
    Ok(weighted_cosine_of(&pairs, &weights))
}

/// Cosine similarity where every term is scaled by `|w_i|`.
///
/// Positions with a missing value in `a`, `b` or `w` (NaN weight) are
/// dropped before accumulation.
pub fn weighted_cosine(a: &[Option<f64>], b: &[Option<f64>], w: &[f64]) -> Result<f64> {
    if w.len() != a.len() {
        return Err(Error::bad_request(format!("{} weights for vectors of length {}",
                                              w.len(), a.len())));
    }
    let (pairs, weights): (Vec<_>, Vec<_>) = overlap_indexed(a, b)?
        .into_iter()
        .filter(|&(i, _)| !w[i].is_nan())
        .map(|(i, p)| (p, w[i].abs()))
        .unzip();
    if pairs.is_empty() {
        return Err(Error::NoOverlap);
    }
    Ok(weighted_cosine_of(&pairs, &weights))
}

fn weighted_cosine_of(pairs: &[(f64, f64)], weights: &[f64]) -> f64 {
    let mut dot = 0.;
    let mut norm_a = 0.;
    let mut norm_b = 0.;
    for (&(x, y), w) in pairs.iter().zip(weights) {
        dot += w * x * y;
        norm_a += w * x * x;
        norm_b += w * y * y;
    }
    if norm_a == 0. || norm_b == 0. {
        return 0.;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn present(x: &Option<f64>) -> Option<f64> {
    x.filter(|v| !v.is_nan())
}

/// Index and values of the positions where both vectors have a value.
fn overlap_indexed(a: &[Option<f64>], b: &[Option<f64>]) -> Result<Vec<(usize, (f64, f64))>> {
    if a.len() != b.len() {
        return Err(Error::bad_request(format!("Cannot compare vectors of length {} and {}",
                                              a.len(), b.len())));
    }
    let pairs = a.iter()
                 .zip(b)
                 .enumerate()
                 .filter_map(|(i, (x, y))| match (present(x), present(y)) {
                     (Some(x), Some(y)) => Some((i, (x, y))),
                     _ => None,
                 })
                 .collect::<Vec<_>>();
    if pairs.is_empty() {
        return Err(Error::NoOverlap);
    }
    Ok(pairs)
}

fn overlap(a: &[Option<f64>], b: &[Option<f64>]) -> Result<Vec<(f64, f64)>> {
    Ok(overlap_indexed(a, b)?.into_iter().map(|(_, p)| p).collect())
}

impl SimilarityMethod {
    /// Similarity of two descriptor representations.
    ///
    /// Euclidean distances `d` are turned into similarities as
    /// `1 / (1 + d)`. `weights` are only used by the weighted cosine,
    /// which falls back to uniform weights if none are given.
    pub fn similarity(&self, a: &Descriptors, b: &Descriptors, weights: Option<&[f64]>)
            -> Result<f64> {
        match (*self, a, b) {
            (SimilarityMethod::Tanimoto,
             &Descriptors::Fingerprint(ref a), &Descriptors::Fingerprint(ref b)) => tanimoto(a, b),
            (SimilarityMethod::Cosine,
             &Descriptors::Properties(ref a), &Descriptors::Properties(ref b)) => cosine(a, b),
            (SimilarityMethod::WeightedCosine,
             &Descriptors::Properties(ref a), &Descriptors::Properties(ref b)) => {
                match weights {
                    Some(w) => weighted_cosine(a, b, w),
                    None => cosine(a, b),
                }
            }
            (SimilarityMethod::Euclidean,
             &Descriptors::Properties(ref a), &Descriptors::Properties(ref b)) => {
                euclidean(a, b).map(|d| 1. / (1. + d))
            }
            (method, _, _) => {
                Err(Error::bad_request(format!("Similarity method '{}' does not apply to these descriptors",
                                               method)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn tanimoto_sets() {
        assert!(tanimoto(&set(&["A", "B"]), &set(&["A"])).unwrap() == 0.5);
        assert!(tanimoto(&set(&["A", "B"]), &set(&["A", "C"])).unwrap() == 1. / 3.);
        assert!(tanimoto(&set(&["A"]), &set(&["B"])).unwrap() == 0.);
        assert!(tanimoto(&set(&["A", "B", "C"]), &set(&["C", "B", "A"])).unwrap() == 1.);

        match tanimoto(&set(&[]), &set(&[])) {
            Err(Error::EmptyInput) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(tanimoto(&set(&[]), &set(&["A"])).unwrap() == 0.);
    }

    /// Verify that self-similarity is maximal for non-degenerate inputs.
    #[test]
    fn self_similarity() {
        let v = vec![Some(0.3), Some(-1.2), None, Some(4.)];
        let w = vec![0.5, 2., 1., 0.1];

        assert!((cosine(&v, &v).unwrap() - 1.).abs() < 1e-12);
        assert!((weighted_cosine(&v, &v, &w).unwrap() - 1.).abs() < 1e-12);
        assert!(euclidean(&v, &v).unwrap() == 0.);
    }

    #[test]
    fn missing_values_are_skipped() {
        let a = vec![Some(1.), None, Some(0.), Some(std::f64::NAN)];
        let b = vec![Some(1.), Some(5.), Some(1.), Some(2.)];

        // Only positions 0 and 2 are compared.
        assert!((cosine(&a, &b).unwrap() - 1. / 2f64.sqrt()).abs() < 1e-12);
        assert!((euclidean(&a, &b).unwrap() - 1.).abs() < 1e-12);

        match cosine(&[None, Some(1.)], &[Some(1.), None]) {
            Err(Error::NoOverlap) => {}
            other => panic!("Unexpected result {:?}", other),
        }
        assert!(cosine(&[Some(1.)], &[Some(1.), Some(2.)]).is_err());
    }

    /// Verify that uniform weights reproduce the plain cosine and that
    /// missing weights drop their position.
    #[test]
    fn weights() {
        let a = vec![Some(1.), Some(2.), Some(-1.)];
        let b = vec![Some(2.), Some(1.), Some(3.)];

        let plain = cosine(&a, &b).unwrap();
        let uniform = weighted_cosine(&a, &b, &[3., 3., -3.]).unwrap();
        assert!((plain - uniform).abs() < 1e-12);

        let dropped = weighted_cosine(&a, &b, &[1., 1., std::f64::NAN]).unwrap();
        let expected = cosine(&a[..2], &b[..2]).unwrap();
        assert!((dropped - expected).abs() < 1e-12);

        assert!(weighted_cosine(&a, &b, &[1., 1.]).is_err());
    }

    #[test]
    fn dispatch() {
        let fp_a = Descriptors::Fingerprint(set(&["A", "B"]));
        let fp_b = Descriptors::Fingerprint(set(&["A"]));
        let props = Descriptors::Properties(vec![Some(1.), Some(1.)]);

        assert!(SimilarityMethod::Tanimoto.similarity(&fp_a, &fp_b, None).unwrap() == 0.5);
        assert!(SimilarityMethod::Euclidean.similarity(&props, &props, None).unwrap() == 1.);
        assert!(SimilarityMethod::Cosine.similarity(&fp_a, &fp_b, None).is_err());
        assert!(SimilarityMethod::Tanimoto.similarity(&fp_a, &props, None).is_err());
    }
}
