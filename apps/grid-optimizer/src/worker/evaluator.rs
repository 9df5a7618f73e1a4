//! The worker seam and the strategy-backed worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{CostModel, OptimizationResult, PriceSeries, Rejection, StrategyEngine, WorkerError};
use crate::metrics::{MetricsCalculator, Trade};
use crate::params::ParameterSet;

/// Evaluates one parameter set against one price series.
///
/// Implementations must be deterministic: identical inputs produce
/// identical results.
#[cfg_attr(test, mockall::automock)]
pub trait Worker: Send + Sync {
    /// Evaluate `params`.
    fn evaluate(
        &self,
        params: &ParameterSet,
        series: &PriceSeries,
        cost: &CostModel,
    ) -> Result<OptimizationResult, WorkerError>;
}

/// Evaluation-level rejection thresholds, applied before grid-level filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerLimits {
    /// Minimum trades for a result to count.
    pub min_trades: usize,
    /// Hard drawdown ceiling in percent; `None` disables it.
    pub max_drawdown_ceiling: Option<Decimal>,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            min_trades: 1,
            max_drawdown_ceiling: None,
        }
    }
}

/// Worker backed by a [`StrategyEngine`].
#[derive(Clone)]
pub struct StrategyWorker {
    engine: Arc<dyn StrategyEngine>,
    limits: WorkerLimits,
}

impl std::fmt::Debug for StrategyWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyWorker")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl StrategyWorker {
    /// Create a worker.
    #[must_use]
    pub fn new(engine: Arc<dyn StrategyEngine>, limits: WorkerLimits) -> Self {
        Self { engine, limits }
    }

    /// Evaluation limits.
    #[must_use]
    pub const fn limits(&self) -> &WorkerLimits {
        &self.limits
    }

    fn run_engine(
        &self,
        params: &ParameterSet,
        series: &PriceSeries,
        cost: &CostModel,
    ) -> Result<Vec<Trade>, WorkerError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.run(params, series, cost)
        }));
        match outcome {
            Ok(Ok(trades)) => Ok(trades),
            Ok(Err(e)) => Err(WorkerError::execution(params, e.message)),
            Err(payload) => Err(WorkerError::execution(
                params,
                format!("strategy panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

impl Worker for StrategyWorker {
    fn evaluate(
        &self,
        params: &ParameterSet,
        series: &PriceSeries,
        cost: &CostModel,
    ) -> Result<OptimizationResult, WorkerError> {
        let trades = self.run_engine(params, series, cost)?;

        let direction = params.direction();
        let leverage = Decimal::from(params.leverage());
        let trades: Vec<Trade> = trades
            .iter()
            .filter(|t| direction.admits(t.side))
            .map(|t| t.scaled(leverage))
            .collect();

        if trades.is_empty() {
            return Err(Rejection::NoTrades.into());
        }
        if trades.len() < self.limits.min_trades {
            return Err(Rejection::InsufficientTrades {
                actual: trades.len(),
                required: self.limits.min_trades,
            }
            .into());
        }

        let metrics = MetricsCalculator::from_trades(trades).calculate();

        if let Some(ceiling) = self.limits.max_drawdown_ceiling
            && metrics.max_drawdown > ceiling
        {
            return Err(Rejection::DrawdownCeiling {
                drawdown: metrics.max_drawdown,
                ceiling,
            }
            .into());
        }

        trace!(params = %params, win_rate = %metrics.win_rate, "Evaluated parameter set");
        Ok(OptimizationResult::from_metrics(*params, &metrics, series.span()))
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
