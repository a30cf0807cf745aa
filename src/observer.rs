//! Progress and warning reporting.
//!
//! Models and validators never write to a global logger directly for
//! events a caller may want to collect; they report to the `Observer`
//! held by their `Context`.
use crate::dataset::SubstanceId;

/// Receives events from model creation, prediction and validation.
///
/// All methods have empty default implementations, so an observer
/// only overrides what it is interested in.
pub trait Observer: Send + Sync {
    /// Called when the fold with (zero-based) index `fold` has been
    /// evaluated, with its instance and unpredicted counts.
    fn on_fold(&self, _fold: usize, _nr_instances: usize, _nr_unpredicted: usize) {}

    /// Called for every recovered per-substance fault.
    fn on_warning(&self, _substance: &SubstanceId, _warning: &str) {}
}

/// Forwards all events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_fold(&self, fold: usize, nr_instances: usize, nr_unpredicted: usize) {
        debug!("Fold {}: {} instances, {} unpredicted", fold + 1, nr_instances, nr_unpredicted);
    }

    fn on_warning(&self, substance: &SubstanceId, warning: &str) {
        warn!("{}: {}", substance, warning);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl Observer for SilentObserver {}
