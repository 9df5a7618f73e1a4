//! Metrics for grid evaluation and batch runs.
//!
//! # Example
//!
//! ```ignore
//! use grid_optimizer::observability::{record_evaluation, EvaluationOutcome};
//!
//! record_evaluation(EvaluationOutcome::Accepted);
//! record_phase("coarse", 12.5, 2187);
//! ```

use ::metrics::{counter, gauge, histogram};

/// Outcome label of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Produced a result.
    Accepted,
    /// Soft-rejected by the worker.
    Rejected,
    /// Missed its deadline.
    Timeout,
    /// Strategy engine failed.
    Failed,
}

impl EvaluationOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
        }
    }
}

/// Record one collected evaluation.
pub fn record_evaluation(outcome: EvaluationOutcome) {
    counter!("optimizer_evaluations_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a finished search phase.
#[allow(clippy::cast_precision_loss)]
pub fn record_phase(phase: &'static str, duration_seconds: f64, evaluations: usize) {
    histogram!("optimizer_phase_duration_seconds", "phase" => phase).record(duration_seconds);
    histogram!("optimizer_phase_evaluations", "phase" => phase).record(evaluations as f64);
}

/// Record a finished batch unit.
pub fn record_batch_unit(status: &'static str) {
    counter!("batch_units_total", "status" => status).increment(1);
}

/// Update batch completion gauges.
#[allow(clippy::cast_precision_loss)]
pub fn update_batch_progress(completed_units: usize, total_units: usize) {
    gauge!("batch_units_completed").set(completed_units as f64);
    gauge!("batch_units_planned").set(total_units as f64);
}
