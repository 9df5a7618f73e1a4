//! Trade-sequence performance metrics.
//!
//! Pure functions over a per-trade PnL sequence (percent units):
//! - Win rate and profit factor
//! - Simple and compound return
//! - Maximum drawdown of the compounded equity curve
//! - Annualized Sharpe ratio
//! - Stability across thirds and average trades per day
//!
//! All arithmetic is on `Decimal` so identical inputs always yield
//! bit-identical outputs.

mod calculator;
mod constants;
mod math;
mod types;

pub use calculator::MetricsCalculator;
pub use types::{Grade, Trade, TradeMetrics};
