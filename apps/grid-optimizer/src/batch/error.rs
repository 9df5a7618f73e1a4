//! Errors for batch runs and their persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::coarse_to_fine::OptimizerError;
use crate::grid::GridError;
use crate::ranking::CriteriaError;

/// State or preset storage failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Affected path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be encoded or decoded.
    #[error("Invalid JSON at {path}: {source}")]
    Json {
        /// Affected path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Preset name unusable as a file name.
    #[error("Invalid preset name: {0}")]
    InvalidName(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Errors that stop a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No symbols configured.
    #[error("Symbol list is empty")]
    EmptySymbols,

    /// No timeframes configured.
    #[error("Timeframe list is empty")]
    EmptyTimeframes,

    /// Resume found a different symbol list than the stored run.
    #[error(
        "Symbol list changed since the stored run ({stored} stored, {configured} configured); \
         set allow_symbol_list_change to resume anyway"
    )]
    SymbolListChanged {
        /// Symbols in the stored state.
        stored: usize,
        /// Symbols configured now.
        configured: usize,
    },

    /// Acceptance thresholds are unusable.
    #[error("Invalid filter criteria: {0}")]
    InvalidCriteria(#[from] CriteriaError),

    /// Grid could not be built.
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Search infrastructure failed.
    #[error("Search error: {0}")]
    Search(OptimizerError),

    /// State could not be durably written or read.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
