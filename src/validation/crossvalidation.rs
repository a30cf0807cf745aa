//! K-fold cross-validation.
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use pcg_rand::Pcg32;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::SubstanceId;
use crate::error::{Error, Result};
use crate::model::{Model, Prediction};
use crate::validation::train_test::predict_held_out;
use crate::validation::{Statistics, Validation};

/// Splits `0..n` into `k` folds after a uniform shuffle.
///
/// Fold sizes differ by at most one; the first `n % k` folds hold the
/// extra instances.
///
/// # Errors
///
/// `BadRequest` unless `2 <= k <= n`.
pub fn folds<R: Rng>(n: usize, k: usize, rng: &mut R) -> Result<Vec<Vec<usize>>> {
    if k < 2 || k > n {
        return Err(Error::bad_request(format!("Cannot split {} instances into {} folds", n, k)));
    }
    let mut indices = (0..n).collect::<Vec<_>>();
    rng.shuffle(&mut indices);

    let size = n / k;
    let remainder = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let end = start + size + if i < remainder { 1 } else { 0 };
        folds.push(indices[start..end].to_vec());
        start = end;
    }
    Ok(folds)
}

/// Seeded PRNG for fold shuffling; unseeded runs draw a seed from the
/// thread-local generator.
pub(crate) fn fold_rng(seed: Option<[u64; 2]>) -> Pcg32 {
    match seed {
        Some(seed) => Pcg32::from_seed(seed),
        None => {
            let mut rng = thread_rng();
            Pcg32::from_seed([rng.gen(), rng.gen()])
        }
    }
}

/// Result of a k-fold cross-validation.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    folds: Vec<Validation>,
    predictions: IndexMap<SubstanceId, Prediction>,
    nr_instances: usize,
    nr_unpredicted: usize,
    statistics: Statistics,
    warnings: Vec<String>,
    finished_at: DateTime<Utc>,
}

impl CrossValidation {
    /// Cross-validates `model` on its training dataset with `nr_folds`
    /// folds.
    ///
    /// Folds are evaluated in parallel; each trains its own model on
    /// the complement of its test partition. The fold shuffle uses
    /// `seed`, or the model configuration's seed if `None`.
    ///
    /// # Errors
    ///
    /// `BadRequest` if the training dataset cannot be split into
    /// `nr_folds` folds.
    pub fn create(model: &Model, nr_folds: usize, seed: Option<[u64; 2]>) -> Result<CrossValidation> {
        let mut rng = fold_rng(seed.or_else(|| model.config().seed()));
        CrossValidation::create_with_rng(model, nr_folds, &mut rng)
    }

    pub(crate) fn create_with_rng<R: Rng>(model: &Model, nr_folds: usize, rng: &mut R)
            -> Result<CrossValidation> {
        let substances = model.training().substances();
        let partitions = folds(substances.len(), nr_folds, rng)?;
        let observer = &model.context().observer;

        let folds = partitions.into_par_iter()
                              .enumerate()
                              .map(|(i, test_indices)| {
                                  let fold = evaluate_fold(model, i, &test_indices);
                                  observer.on_fold(i, fold.nr_instances(), fold.nr_unpredicted());
                                  fold
                              })
                              .collect::<Vec<_>>();

        let mut predictions = IndexMap::new();
        let mut warnings = vec![];
        let mut nr_instances = 0;
        let mut nr_unpredicted = 0;
        for fold in &folds {
            nr_instances += fold.nr_instances();
            nr_unpredicted += fold.nr_unpredicted();
            warnings.extend(fold.warnings().iter().cloned());
            for (id, p) in fold.predictions() {
                predictions.insert(id.clone(), p.clone());
            }
        }
        let (statistics, _) = Statistics::compute(model.feature(), predictions.values());

        info!("{}-fold cross-validation of '{}': {} instances, {} unpredicted",
              nr_folds, model.feature().name, nr_instances, nr_unpredicted);

        Ok(CrossValidation {
            folds: folds,
            predictions: predictions,
            nr_instances: nr_instances,
            nr_unpredicted: nr_unpredicted,
            statistics: statistics,
            warnings: warnings,
            finished_at: Utc::now(),
        })
    }

    /// Fold validations, in fold order.
    pub fn folds(&self) -> &[Validation] {
        &self.folds
    }

    /// Predictions of all folds. Every training substance appears once.
    pub fn predictions(&self) -> &IndexMap<SubstanceId, Prediction> {
        &self.predictions
    }

    pub fn nr_instances(&self) -> usize {
        self.nr_instances
    }

    pub fn nr_unpredicted(&self) -> usize {
        self.nr_unpredicted
    }

    /// Statistics over the predictions of all folds.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Trains on the complement of `test_indices` and predicts the test
/// partition. A fold whose model cannot be created leaves its test
/// substances unpredicted.
fn evaluate_fold(model: &Model, fold: usize, test_indices: &[usize]) -> Validation {
    let dataset = model.training();
    let substances = dataset.substances();
    let mut is_test = vec![false; substances.len()];
    for &i in test_indices {
        is_test[i] = true;
    }
    let ids = |test: bool| {
        substances.iter()
                  .zip(&is_test)
                  .filter(|&(_, &t)| t == test)
                  .map(|(s, _)| s.id.clone())
                  .collect::<Vec<_>>()
    };

    let training = dataset.subset(format!("{} (fold {} training)", dataset.name(), fold + 1), &ids(false));
    let test = dataset.subset(format!("{} (fold {} test)", dataset.name(), fold + 1), &ids(true));

    match Model::create(&training, &model.feature().id, model.config(), model.context()) {
        Ok(fold_model) => {
            let predictions = predict_held_out(&fold_model, &test, test.substances());
            Validation::finish(&fold_model, predictions, vec![])
        }
        Err(e) => {
            let warning = format!("Fold {}: model creation failed: {}", fold + 1, e);
            warn!("{}", warning);
            let predictions = test.substances()
                                  .iter()
                                  .map(|s| {
                                      let mut p = Prediction::unavailable(s.id.clone(), warning.clone());
                                      p.measurements = test.values(&s.id, &model.feature().id).to_vec();
                                      p
                                  })
                                  .collect();
            Validation::finish(model, predictions, vec![warning])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::config::{Config, Context};
    use crate::dataset::{Dataset, Feature, Substance, Value};
    use crate::descriptor::DescriptorTable;

    /// Verify that folds partition the instances and differ in size by
    /// at most one.
    #[test]
    fn partition() {
        let mut rng = Pcg32::from_seed([0, 1]);
        for &(n, k) in &[(10, 3), (4, 2), (7, 7), (100, 10), (11, 4)] {
            let folds = folds(n, k, &mut rng).unwrap();
            let sizes = folds.iter().map(|f| f.len()).collect::<Vec<_>>();
            let all = folds.iter().flat_map(|f| f.iter().cloned()).collect::<HashSet<_>>();

            assert!(folds.len() == k);
            assert!(sizes.iter().sum::<usize>() == n);
            assert!(all.len() == n);
            assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
            assert!(sizes[0] - sizes[k - 1] <= 1);
        }
    }

    #[test]
    fn invalid_folds() {
        let mut rng = Pcg32::from_seed([0, 1]);
        assert!(folds(5, 1, &mut rng).is_err());
        assert!(folds(5, 6, &mut rng).is_err());
    }

    /// Verify that equal seeds give equal folds.
    #[test]
    fn seeded() {
        let a = folds(20, 4, &mut fold_rng(Some([0, 7]))).unwrap();
        let b = folds(20, 4, &mut fold_rng(Some([0, 7]))).unwrap();
        assert!(a == b);
    }

    /// Verify that a fold without measured training substances leaves
    /// its test substances unpredicted, while the other folds go on.
    #[test]
    fn failed_fold() {
        let feature = Feature::numeric("logc", "log concentration", None);
        let mut ds = Dataset::new("sparse");
        ds.add_feature(feature.clone());
        let mut table = DescriptorTable::new();
        for i in 0..4 {
            let s = Substance::new(format!("s{}", i));
            table.add_fingerprint(&s.id, "MP2D", vec!["A".to_string(), format!("t{}", i)]);
            ds.add_substance(s);
        }
        ds.add_value(&SubstanceId::from("s0"), &feature.id, Value::Numeric(1.)).unwrap();
        let context = Context::new(Arc::new(table));
        let mut config = Config::default();
        config.min_similarity = Some(0.);
        let model = Model::create(&ds, &feature.id, &config, &context).unwrap();

        let cv = CrossValidation::create(&model, 2, Some([0, 3])).unwrap();
        let failed = cv.folds()
                       .iter()
                       .filter(|f| f.warnings().iter().any(|w| w.contains("model creation failed")))
                       .collect::<Vec<_>>();

        assert!(cv.folds().len() == 2);
        assert!(failed.len() == 1);
        assert!(failed[0].predictions().contains_key(&SubstanceId::from("s0")));
        assert!(failed[0].predictions().values().all(|p| p.value.is_none()));
        assert!(failed[0].predictions().values().all(|p| p.warnings[0].starts_with("Fold ")));
        assert!(cv.warnings().iter().filter(|w| w.contains("model creation failed")).count() == 1);
        assert!(cv.predictions().len() == 4);
        assert!(cv.predictions()[&SubstanceId::from("s0")].measurements == vec![Value::Numeric(1.)]);
    }
}
