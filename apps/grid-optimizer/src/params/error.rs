//! Error types for parameter parsing and validation.

use thiserror::Error;

use super::ParamKey;

/// Errors from parameter parsing, typing and range validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    /// Timeframe label not recognised.
    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    /// Direction label not recognised.
    #[error("Unknown direction: {0}")]
    UnknownDirection(String),

    /// Value variant does not match the key's kind.
    #[error("Parameter '{key}' expects a {expected} value, got {actual}")]
    TypeMismatch {
        /// Parameter key.
        key: ParamKey,
        /// Expected kind.
        expected: &'static str,
        /// Rendered offending value.
        actual: String,
    },

    /// NaN or infinite numeric value.
    #[error("Parameter '{key}' must be finite")]
    NonFinite {
        /// Parameter key.
        key: ParamKey,
    },

    /// Numeric range with min above max.
    #[error("Parameter '{key}' has inverted range [{min}, {max}]")]
    InvertedRange {
        /// Parameter key.
        key: ParamKey,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Categorical range without values.
    #[error("Parameter '{key}' has no candidate values")]
    EmptyCategory {
        /// Parameter key.
        key: ParamKey,
    },
}
