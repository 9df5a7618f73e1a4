//! Worker outcomes other than a result.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::params::ParameterSet;

/// Non-fatal reasons a parameter set produced no usable result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    /// The strategy never traded.
    #[error("no trades")]
    NoTrades,

    /// Fewer trades than the evaluation minimum.
    #[error("trades {actual} < {required}")]
    InsufficientTrades {
        /// Trades taken.
        actual: usize,
        /// Configured minimum.
        required: usize,
    },

    /// Drawdown above the evaluation-level hard ceiling.
    #[error("drawdown {drawdown}% > ceiling {ceiling}%")]
    DrawdownCeiling {
        /// Observed max drawdown (percent).
        drawdown: Decimal,
        /// Configured ceiling (percent).
        ceiling: Decimal,
    },

    /// Evaluation exceeded its deadline.
    #[error("timed out after {limit_ms}ms")]
    Timeout {
        /// Deadline in milliseconds.
        limit_ms: u64,
    },
}

/// Errors from a single evaluation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkerError {
    /// Soft outcome; recorded, never fatal.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The strategy engine itself failed.
    #[error("strategy failed for [{params}]: {message}")]
    Execution {
        /// Offending parameter set.
        params: Box<ParameterSet>,
        /// Engine error or panic message.
        message: String,
    },
}

impl WorkerError {
    /// Execution failure for `params`.
    pub fn execution(params: &ParameterSet, message: impl Into<String>) -> Self {
        Self::Execution {
            params: Box::new(*params),
            message: message.into(),
        }
    }

    /// Whether this is a soft rejection.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
