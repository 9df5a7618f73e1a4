//! Strategy engine seam and its immutable inputs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::Trade;
use crate::params::{ParameterSet, Timeframe};

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time.
    pub timestamp: DateTime<Utc>,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: Decimal,
}

/// Immutable, reference-shared price history for one symbol and timeframe.
///
/// Cloning is cheap; every concurrent evaluation reads the same buffer.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: Arc<str>,
    timeframe: Timeframe,
    candles: Arc<[Candle]>,
}

impl PriceSeries {
    /// Wrap a candle history.
    #[must_use]
    pub fn new(symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self {
            symbol: Arc::from(symbol),
            timeframe,
            candles: Arc::from(candles),
        }
    }

    /// Symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bar interval.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Bars, oldest first.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Whether there are no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// First and last bar timestamps.
    #[must_use]
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.candles.first()?.timestamp, self.candles.last()?.timestamp))
    }
}

/// Per-side trading costs as fractions of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostModel {
    /// Exchange fee rate per side.
    pub fee_rate: Decimal,
    /// Expected slippage per side.
    pub slippage_rate: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.00055),
            slippage_rate: dec!(0.0005),
        }
    }
}

impl CostModel {
    /// Entry plus exit cost as a fraction of notional.
    #[must_use]
    pub fn round_trip(&self) -> Decimal {
        (self.fee_rate + self.slippage_rate) * Decimal::TWO
    }
}

/// Failure raised by a strategy engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StrategyError {
    /// Error message.
    pub message: String,
}

impl StrategyError {
    /// Create an error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Strategy simulation collaborator.
///
/// Implementations must be pure: identical inputs yield identical trades.
#[cfg_attr(test, mockall::automock)]
pub trait StrategyEngine: Send + Sync {
    /// Simulate the strategy and return closed trades in execution order.
    fn run(
        &self,
        params: &ParameterSet,
        series: &PriceSeries,
        cost: &CostModel,
    ) -> Result<Vec<Trade>, StrategyError>;
}
