//! Error types for grid construction.

use thiserror::Error;

use crate::params::{ParamError, ParamKey};

/// Errors from grid construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    /// A parameter has no candidate values.
    #[error("Parameter '{key}' has no candidate values")]
    EmptyAxis {
        /// Offending key.
        key: ParamKey,
    },

    /// A parameter was never given an axis.
    #[error("Parameter '{key}' is missing from the grid")]
    MissingAxis {
        /// Offending key.
        key: ParamKey,
    },

    /// A candidate value has the wrong kind or is not finite.
    #[error(transparent)]
    InvalidValue(#[from] ParamError),

    /// Refinement was asked to center on an empty result list.
    #[error("Cannot refine a grid without results")]
    NoResults,

    /// Refinement settings out of range.
    #[error("Invalid refinement: {message}")]
    InvalidRefinement {
        /// Error message.
        message: String,
    },
}
