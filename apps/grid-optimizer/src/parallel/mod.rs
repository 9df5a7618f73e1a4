//! Parallel evaluation infrastructure using Rayon.
//!
//! Fans a grid's combinations out across a bounded local thread pool:
//! - Submission is windowed: at most `workers` tasks are in flight
//! - Results come back over a channel in completion order
//! - Progress `(completed, total, message)` is reported after every result
//! - Cancellation is cooperative and observed before each submission
//! - Every evaluation has a deadline derived from the series length
//!
//! # Worker sizing
//!
//! The pool size starts from the physical core count, divided by the
//! threads each evaluation uses internally, then capped by the configured
//! memory budget:
//!
//! ```ignore
//! let config = ParallelConfig {
//!     evaluation_threads: 2,
//!     memory_per_worker_mb: 512,
//!     available_memory_mb: Some(4096),
//!     ..ParallelConfig::default()
//! };
//! let dispatcher = Dispatcher::new(config)?;
//! let outcome = dispatcher.dispatch(worker, combos, &series, &cost, &cancel, None)?;
//! ```

mod config;
mod error;
mod executor;
mod progress;
mod result;

pub use config::ParallelConfig;
pub use error::DispatchError;
pub use executor::Dispatcher;
pub use progress::{Progress, ProgressObserver, ProgressTracker};
pub use result::{DispatchOutcome, FailedTask, RejectedTask};
