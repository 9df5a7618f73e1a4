//! Error types for parallel dispatch.

use thiserror::Error;

/// Errors from parallel dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPoolError {
        /// Error message.
        message: String,
    },

    /// No combinations to evaluate.
    #[error("No parameter combinations to evaluate")]
    NoJobs,

    /// The result channel closed while tasks were in flight.
    #[error("Result channel closed with {in_flight} tasks in flight")]
    ChannelClosed {
        /// Tasks still outstanding.
        in_flight: usize,
    },
}
