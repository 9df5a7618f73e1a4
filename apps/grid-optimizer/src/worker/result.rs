//! Evaluation result value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::metrics::{Grade, TradeMetrics};
use crate::params::ParameterSet;

/// Metrics of one parameter set on one price series.
///
/// Produced once by a worker and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Evaluated parameters.
    pub params: ParameterSet,
    /// Number of trades.
    pub total_trades: usize,
    /// Win rate in percent.
    pub win_rate: Decimal,
    /// Max drawdown in percent.
    pub max_drawdown: Decimal,
    /// Annualized Sharpe ratio.
    pub sharpe_ratio: Decimal,
    /// Gross gains over gross losses.
    pub profit_factor: Decimal,
    /// Sum of trade returns in percent.
    pub simple_return: Decimal,
    /// Compounded return in percent.
    pub compound_return: Decimal,
    /// Average trades per day.
    pub avg_trades_per_day: Decimal,
    /// Profitable thirds (0-3).
    pub stability: Option<u8>,
    /// Quality grade.
    pub grade: Grade,
    /// First bar of the evaluated series.
    pub backtest_start: Option<DateTime<Utc>>,
    /// Last bar of the evaluated series.
    pub backtest_end: Option<DateTime<Utc>>,
    /// Whole days between start and end.
    pub backtest_days: Option<i64>,
}

impl OptimizationResult {
    /// Result from computed metrics and the evaluated series span.
    #[must_use]
    pub fn from_metrics(
        params: ParameterSet,
        metrics: &TradeMetrics,
        span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Self {
        Self {
            params,
            total_trades: metrics.total_trades,
            win_rate: metrics.win_rate,
            max_drawdown: metrics.max_drawdown,
            sharpe_ratio: metrics.sharpe_ratio,
            profit_factor: metrics.profit_factor,
            simple_return: metrics.simple_return,
            compound_return: metrics.compound_return,
            avg_trades_per_day: metrics.avg_trades_per_day,
            stability: metrics.stability,
            grade: Grade::classify(metrics.win_rate, metrics.profit_factor, metrics.max_drawdown),
            backtest_start: span.map(|(start, _)| start),
            backtest_end: span.map(|(_, end)| end),
            backtest_days: span.map(|(start, end)| (end - start).num_days()),
        }
    }

    /// Total return used for ranking (sum of trade returns).
    #[must_use]
    pub const fn total_return(&self) -> Decimal {
        self.simple_return
    }
}
