//! Repeated cross-validation.
use crate::error::Result;
use crate::model::Model;
use crate::validation::crossvalidation::{fold_rng, CrossValidation};

pub const DEFAULT_REPEATS: usize = 3;

/// Independent k-fold cross-validations of the same model.
///
/// Results are kept per repeat; nothing is pooled across repeats.
#[derive(Debug, Clone)]
pub struct RepeatedCrossValidation {
    crossvalidations: Vec<CrossValidation>,
}

impl RepeatedCrossValidation {
    /// Runs `repeats` cross-validations with `nr_folds` folds, each
    /// with its own random partition. All partitions are drawn from one
    /// PRNG seeded with `seed` (or the model configuration's seed).
    ///
    /// # Errors
    ///
    /// `BadRequest` if the training dataset cannot be split into
    /// `nr_folds` folds.
    pub fn create(model: &Model, nr_folds: usize, repeats: usize, seed: Option<[u64; 2]>)
            -> Result<RepeatedCrossValidation> {
        let mut rng = fold_rng(seed.or_else(|| model.config().seed()));
        let crossvalidations = (0..repeats).map(|r| {
                                               debug!("Cross-validation repeat {}/{}", r + 1, repeats);
                                               CrossValidation::create_with_rng(model, nr_folds, &mut rng)
                                           })
                                           .collect::<Result<Vec<_>>>()?;
        Ok(RepeatedCrossValidation { crossvalidations: crossvalidations })
    }

    pub fn crossvalidations(&self) -> &[CrossValidation] {
        &self.crossvalidations
    }

    pub fn len(&self) -> usize {
        self.crossvalidations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crossvalidations.is_empty()
    }
}
