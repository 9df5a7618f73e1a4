//! Structured end-of-run summary.

use serde::{Deserialize, Serialize};

use super::{FailedSymbol, OptimizationState};
use crate::params::Timeframe;
use crate::ranking::FilterCriteria;

/// What a batch run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Exchange label.
    pub exchange: String,
    /// Timeframes per symbol.
    pub timeframes: Vec<Timeframe>,
    /// Number of symbols.
    pub total_symbols: usize,
    /// Number of units.
    pub total_units: usize,
    /// Units done.
    pub completed_units: usize,
    /// Units that produced a preset.
    pub success_count: usize,
    /// Units whose best result missed the criteria.
    pub rejected_count: usize,
    /// Units without a result.
    pub failed_count: usize,
    /// First failures, reasons verbatim.
    pub failures: Vec<FailedSymbol>,
    /// Failures left out of `failures`.
    pub failures_omitted: usize,
    /// Acceptance thresholds.
    pub thresholds: FilterCriteria,
    /// Units evaluated by this invocation.
    pub units_run: usize,
    /// Whether the run was stopped before the end.
    pub stopped: bool,
}

impl BatchSummary {
    /// Summary of `state`, keeping the first `failure_limit` failures.
    #[must_use]
    pub fn from_state(
        state: &OptimizationState,
        failure_limit: usize,
        units_run: usize,
        stopped: bool,
    ) -> Self {
        let failures: Vec<FailedSymbol> = state
            .failed_symbols
            .iter()
            .take(failure_limit)
            .cloned()
            .collect();
        Self {
            exchange: state.exchange.clone(),
            timeframes: state.timeframes.clone(),
            total_symbols: state.total_symbols,
            total_units: state.total_units,
            completed_units: state.completed_units,
            success_count: state.success_count,
            rejected_count: state.rejected_count,
            failed_count: state.failed_count,
            failures_omitted: state.failed_symbols.len() - failures.len(),
            failures,
            thresholds: state.thresholds.clone(),
            units_run,
            stopped,
        }
    }

    /// Units without a preset.
    #[must_use]
    pub const fn unsuccessful(&self) -> usize {
        self.rejected_count + self.failed_count
    }

    /// Symbols listed in `failures`, in order, without repeats.
    #[must_use]
    pub fn failed_symbol_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.symbol.as_str()) {
                names.push(&failure.symbol);
            }
        }
        names
    }
}
