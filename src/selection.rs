//! Property scaling and feature selection.
use statrs::distribution::{StudentsT, Univariate};
use statrs::statistics::{Mean, Variance};

use crate::descriptor::Descriptors;

/// Largest p-value of a correlation kept by the correlation filter.
pub const MAX_P_VALUE: f64 = 0.05;

fn present(x: &Option<f64>) -> Option<f64> {
    x.filter(|v| !v.is_nan())
}

/// Column-wise standardization of property vectors.
///
/// Parameters are estimated on the training substances only. Columns
/// with fewer than two values or zero variance map to missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardization {
    means: Vec<f64>,
    std_devs: Vec<Option<f64>>,
}

impl Standardization {
    /// Estimates mean and sample standard deviation of each of the
    /// `width` columns.
    pub fn fit(rows: &[&[Option<f64>]], width: usize) -> Standardization {
        let mut means = Vec::with_capacity(width);
        let mut std_devs = Vec::with_capacity(width);

        for j in 0..width {
            let column = rows.iter()
                             .filter_map(|r| r.get(j).and_then(present))
                             .collect::<Vec<_>>();
            if column.len() < 2 {
                means.push(0.);
                std_devs.push(None);
                continue;
            }
            let sd = column.std_dev();
            means.push(column.mean());
            std_devs.push(if sd > 0. && sd.is_finite() { Some(sd) } else { None });
        }

        Standardization {
            means: means,
            std_devs: std_devs,
        }
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Standardized copy of `values`.
    pub fn apply(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        values.iter()
              .zip(self.means.iter().zip(&self.std_devs))
              .map(|(x, (m, sd))| match (present(x), *sd) {
                  (Some(x), Some(sd)) => Some((x - m) / sd),
                  _ => None,
              })
              .collect()
    }

    /// Standardizes property descriptors; fingerprints are returned
    /// unchanged.
    pub fn transform(&self, descriptors: &Descriptors) -> Descriptors {
        match *descriptors {
            Descriptors::Properties(ref p) => Descriptors::Properties(self.apply(p)),
            ref fp => fp.clone(),
        }
    }
}

/// Pearson correlation of the pairs, `None` if undefined.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0., 0., 0.);
    for &(x, y) in pairs {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x).powi(2);
        syy += (y - mean_y).powi(2);
    }
    if sxx == 0. || syy == 0. {
        return None;
    }
    Some(sxy / (sxx.sqrt() * syy.sqrt()))
}

/// Two-sided p-value of a correlation `r` over `n` pairs.
pub fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    let df = (n - 2) as f64;
    if r.abs() >= 1. {
        return Some(0.);
    }
    let t = r * (df / (1. - r * r)).sqrt();
    let dist = StudentsT::new(0., 1., df).ok()?;
    Some(2. * (1. - dist.cdf(t.abs())))
}

/// Correlation-filter weights.
///
/// `rows` are the (standardized) property vectors of the training
/// substances and `targets` their measured values. A descriptor whose
/// correlation with the target has p-value ≤ `MAX_P_VALUE` gets its
/// squared correlation as weight; the others get NaN, which the
/// weighted cosine treats as missing.
pub fn correlation_weights(rows: &[&[Option<f64>]], targets: &[f64], width: usize) -> Vec<f64> {
    (0..width).map(|j| {
                  let pairs = rows.iter()
                                  .zip(targets)
                                  .filter_map(|(r, &y)| r.get(j).and_then(present).map(|x| (x, y)))
                                  .collect::<Vec<_>>();
                  let r = match pearson(&pairs) {
                      Some(r) => r,
                      None => return std::f64::NAN,
                  };
                  match correlation_p_value(r, pairs.len()) {
                      Some(p) if p <= MAX_P_VALUE => r * r,
                      _ => std::f64::NAN,
                  }
              })
              .collect()
}
