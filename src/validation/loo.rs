//! Leave-one-out validation.
use crate::error::{Error, Result};
use crate::model::{Mode, Model};
use crate::validation::Validation;

/// Leave-one-out validation.
///
/// Every training substance is predicted by the model itself with the
/// measured-value shortcut disabled; the neighbor search never returns
/// the query substance, so each substance is predicted without its own
/// measurements.
pub struct LeaveOneOut;

impl LeaveOneOut {
    /// # Errors
    ///
    /// `Precondition` if the model's descriptor weights were fitted on
    /// the whole training set, since the left-out substance would have
    /// influenced its own prediction.
    pub fn create(model: &Model) -> Result<Validation> {
        if model.has_feature_selection() {
            return Err(Error::precondition("Leave-one-out validation is not possible with feature selection fitted on the whole training set"));
        }

        let predictions = model.predict_all(model.training().substances(), Mode::Validate);
        for (i, p) in predictions.iter().enumerate() {
            debug!("LOO {}/{}: {} predicted: {}", i + 1, predictions.len(), p.substance, p.is_predicted());
        }
        let validation = Validation::finish(model, predictions, vec![]);

        info!("Leave-one-out validation of '{}': {} instances, {} unpredicted",
              model.feature().name, validation.nr_instances(), validation.nr_unpredicted());
        Ok(validation)
    }
}
