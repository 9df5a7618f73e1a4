//! Price series supply and batch event callbacks.

use thiserror::Error;

use crate::params::Timeframe;
use crate::worker::PriceSeries;

/// Price data for a unit could not be provided.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no price data: {message}")]
pub struct SourceError {
    /// What went wrong.
    pub message: String,
}

impl SourceError {
    /// Create a source error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Supplies the price series of a symbol and timeframe.
#[cfg_attr(test, mockall::automock)]
pub trait PriceSeriesSource: Send + Sync {
    /// Load the series for one unit.
    ///
    /// # Errors
    ///
    /// Returns error if no series is available.
    fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<PriceSeries, SourceError>;
}

/// Lifecycle of one symbol x timeframe unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// Not started.
    Pending,
    /// Search in progress.
    Running,
    /// Best result met the criteria; preset written.
    Accepted,
    /// Best result missed the criteria.
    Rejected,
    /// No result at all.
    Failed,
}

impl UnitStatus {
    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Batch event callbacks. Every method defaults to a no-op.
pub trait BatchObserver: Send + Sync {
    /// Free-form status line.
    fn on_status(&self, _message: &str) {}

    /// Unit `current` of `total` is starting on `symbol`.
    fn on_progress(&self, _current: usize, _total: usize, _symbol: &str) {}

    /// A unit changed state.
    fn on_unit(&self, _symbol: &str, _timeframe: Timeframe, _status: UnitStatus) {}

    /// Running tally after each unit.
    fn on_tally(&self, _accepted: usize, _rejected: usize, _failed: usize) {}
}
