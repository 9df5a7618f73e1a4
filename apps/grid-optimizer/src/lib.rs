// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Grid Optimizer - strategy parameter search core.
//!
//! Searches discrete parameter spaces for trading-strategy configurations
//! that meet strict acceptance criteria (minimum win rate, maximum drawdown,
//! minimum trade count) and persists the accepted ones as presets.
//!
//! # Layers (leaves first)
//!
//! - `params`: strongly typed parameter keys, values, sets and valid ranges
//! - `grid`: cartesian grids and the `GridBuilder` (modes, estimate, coarse, refine)
//! - `metrics`: deterministic trade-sequence metrics on `Decimal`
//! - `worker`: evaluation of one parameter set against one price series
//! - `parallel`: bounded worker pool with progress and cooperative cancellation
//! - `ranking`: dedup, hard filter and stable ranking of results
//! - `coarse_to_fine`: three-phase adaptive search
//! - `batch`: resumable symbol x timeframe driver and preset emission
//!
//! The concrete strategy simulation is an external collaborator, plugged in
//! through [`worker::StrategyEngine`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod batch;
pub mod coarse_to_fine;
pub mod config;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod observability;
pub mod parallel;
pub mod params;
pub mod ranking;
pub mod telemetry;
pub mod worker;

pub use batch::{BatchOptimizer, BatchSummary, OptimizationState};
pub use coarse_to_fine::{CoarseToFineOptimizer, CoarseToFineOutcome, Phase};
pub use error::{Error, ErrorKind};
pub use grid::{GridBuilder, GridMode, ParameterGrid};
pub use parallel::Dispatcher;
pub use params::{Direction, ParamKey, ParamValue, ParameterRanges, ParameterSet, Timeframe};
pub use ranking::{FilterCriteria, RankMetric, RankedResultSet};
pub use worker::{OptimizationResult, StrategyEngine, StrategyWorker, Worker};
