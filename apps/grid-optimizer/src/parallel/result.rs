//! Result types for parallel dispatch.

use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::worker::{OptimizationResult, Rejection};

/// A combination that was soft-rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedTask {
    /// Evaluated parameters.
    pub params: ParameterSet,
    /// Rejection reason, rendered.
    pub reason: String,
    /// Whether the rejection was a missed deadline.
    pub timed_out: bool,
}

impl RejectedTask {
    pub(super) fn new(params: ParameterSet, rejection: &Rejection) -> Self {
        Self {
            params,
            reason: rejection.to_string(),
            timed_out: matches!(rejection, Rejection::Timeout { .. }),
        }
    }
}

/// A combination whose evaluation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTask {
    /// Evaluated parameters.
    pub params: ParameterSet,
    /// Failure message.
    pub message: String,
}

/// Everything collected from one dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Results in completion order.
    pub results: Vec<OptimizationResult>,
    /// Submission index of each entry in `results`.
    pub submission_ids: Vec<usize>,
    /// Soft rejections, including timeouts.
    pub rejected: Vec<RejectedTask>,
    /// Execution failures.
    pub failed: Vec<FailedTask>,
    /// Combinations handed to the dispatcher.
    pub total: usize,
    /// Combinations actually submitted.
    pub submitted: usize,
    /// Whether cancellation left combinations unsubmitted.
    pub cancelled: bool,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u64,
}

impl DispatchOutcome {
    /// Number of collected tasks, whatever their outcome.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.results.len() + self.rejected.len() + self.failed.len()
    }

    /// Get the success rate over collected tasks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let collected = self.collected();
        if collected == 0 {
            0.0
        } else {
            self.results.len() as f64 / collected as f64
        }
    }

    /// Results reordered by submission index, which is grid order.
    #[must_use]
    pub fn into_submission_order(self) -> Vec<OptimizationResult> {
        let mut indexed: Vec<(usize, OptimizationResult)> =
            self.submission_ids.into_iter().zip(self.results).collect();
        indexed.sort_by_key(|(id, _)| *id);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TradeMetrics;
    use crate::params::{ParamKey, ParamValue};

    fn result(atr: f64) -> OptimizationResult {
        let Ok(params) = ParameterSet::default().with(ParamKey::AtrMult, ParamValue::Float(atr)) else {
            panic!("invalid params");
        };
        OptimizationResult::from_metrics(params, &TradeMetrics::default(), None)
    }

    #[test]
    fn test_into_submission_order() {
        let outcome = DispatchOutcome {
            results: vec![result(3.0), result(1.0), result(2.0)],
            submission_ids: vec![2, 0, 1],
            total: 3,
            submitted: 3,
            ..DispatchOutcome::default()
        };
        assert_eq!(outcome.collected(), 3);
        let ordered = outcome.into_submission_order();
        let atrs: Vec<f64> = ordered.iter().map(|r| r.params.atr_mult()).collect();
        assert_eq!(atrs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(DispatchOutcome::default().success_rate(), 0.0);
    }
}
