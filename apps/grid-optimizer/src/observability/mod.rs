//! Observability module for metrics.
//!
//! Records evaluation, phase and batch-unit metrics through the `metrics`
//! facade. No exporter is installed here; the embedding application decides
//! where metrics go.

mod metrics;

pub use metrics::{
    EvaluationOutcome, record_batch_unit, record_evaluation, record_phase, update_batch_progress,
};
