//! Evaluation of one parameter set against one price series.
//!
//! The [`Worker`] trait is the seam the dispatcher fans out over;
//! [`StrategyWorker`] is the production implementation that runs a
//! [`StrategyEngine`], applies direction and leverage, computes metrics and
//! classifies soft rejections.

mod engine;
mod error;
mod evaluator;
mod result;

pub use engine::{Candle, CostModel, PriceSeries, StrategyEngine, StrategyError};
pub use error::{Rejection, WorkerError};
pub use evaluator::{StrategyWorker, Worker, WorkerLimits};
pub(crate) use evaluator::panic_message;
pub use result::OptimizationResult;

#[cfg(test)]
pub use engine::MockStrategyEngine;
#[cfg(test)]
pub use evaluator::MockWorker;
