//! Errors for adaptive search.

use thiserror::Error;

use super::Phase;
use crate::grid::GridError;
use crate::parallel::DispatchError;

/// Errors from a search run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    /// Grid construction failed.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Dispatch failed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// No phase produced a ranked result.
    #[error("No viable result after {phase} phase")]
    NoViableResult {
        /// Phase that came up empty.
        phase: Phase,
    },
}
