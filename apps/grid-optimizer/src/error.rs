//! Crate-level error and its failure taxonomy.
//!
//! | Kind | Examples | Handling |
//! |------|----------|----------|
//! | `SoftReject` | no trades, too few trades, drawdown ceiling, timeout | recorded, never fatal |
//! | `Execution` | strategy engine failure, broken worker pool | logged with the parameter set |
//! | `Persistence` | state or preset write failed | surfaced immediately |
//! | `Configuration` | empty grid, empty symbol list, bad thresholds | fails before dispatch |

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::{BatchError, PersistenceError};
use crate::coarse_to_fine::OptimizerError;
use crate::config::ConfigError;
use crate::grid::GridError;
use crate::parallel::DispatchError;
use crate::params::ParamError;
use crate::ranking::CriteriaError;
use crate::worker::WorkerError;

/// Failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Non-fatal evaluation outcome.
    SoftReject,
    /// The strategy or the pool failed.
    Execution,
    /// Durable storage failed.
    Persistence,
    /// Invalid input, detected before any evaluation.
    Configuration,
}

impl ErrorKind {
    /// Stable reason label.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::SoftReject => "SOFT_REJECT",
            Self::Execution => "EXECUTION_ERROR",
            Self::Persistence => "PERSISTENCE_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
        }
    }

    /// Whether a batch may continue past this failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SoftReject | Self::Execution)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Any error raised by the optimizer.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Parameter problem.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// Grid problem.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Threshold problem.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    /// Single evaluation outcome.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Worker pool problem.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Search problem.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Storage problem.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Batch problem.
    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl Error {
    /// Failure class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Param(_) | Self::Criteria(_) => ErrorKind::Configuration,
            Self::Grid(e) => grid_kind(e),
            Self::Worker(e) => {
                if e.is_rejection() {
                    ErrorKind::SoftReject
                } else {
                    ErrorKind::Execution
                }
            }
            Self::Dispatch(e) => dispatch_kind(e),
            Self::Optimizer(e) => optimizer_kind(e),
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::Batch(e) => match e {
                BatchError::Persistence(_) => ErrorKind::Persistence,
                BatchError::Search(e) => optimizer_kind(e),
                BatchError::Grid(e) => grid_kind(e),
                BatchError::EmptySymbols
                | BatchError::EmptyTimeframes
                | BatchError::SymbolListChanged { .. }
                | BatchError::InvalidCriteria(_) => ErrorKind::Configuration,
            },
        }
    }
}

const fn grid_kind(error: &GridError) -> ErrorKind {
    match error {
        GridError::NoResults => ErrorKind::SoftReject,
        _ => ErrorKind::Configuration,
    }
}

const fn dispatch_kind(error: &DispatchError) -> ErrorKind {
    match error {
        DispatchError::NoJobs => ErrorKind::Configuration,
        _ => ErrorKind::Execution,
    }
}

const fn optimizer_kind(error: &OptimizerError) -> ErrorKind {
    match error {
        OptimizerError::NoViableResult { .. } => ErrorKind::SoftReject,
        OptimizerError::Grid(e) => grid_kind(e),
        OptimizerError::Dispatch(e) => dispatch_kind(e),
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;
