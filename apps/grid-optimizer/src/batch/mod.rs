//! Resumable multi-symbol batch optimization.
//!
//! Iterates every symbol x timeframe unit, searches each one, applies the
//! acceptance filter and writes presets for the winners. Progress is
//! written durably after every unit so an interrupted run loses at most
//! the unit in flight.
//!
//! # Unit lifecycle
//!
//! `Pending -> Running -> (Accepted | Rejected | Failed)`
//!
//! - **Accepted**: best result met every threshold, preset written
//! - **Rejected**: best result missed one or more thresholds, all listed
//! - **Failed**: no price data, or no combination produced a result

mod control;
mod driver;
mod error;
mod persist;
mod preset;
mod source;
mod state;
mod summary;

pub use control::BatchControl;
pub use driver::{BatchConfig, BatchOptimizer, NO_RESULT_REASON, SearchMode};
pub use error::{BatchError, PersistenceError};
pub use preset::{JsonPresetStore, Preset, PresetMeta, PresetResult, PresetStore, preset_name};
pub use source::{BatchObserver, PriceSeriesSource, SourceError, UnitStatus};
pub use state::{FailedSymbol, JsonStateStore, OptimizationState, StateStore};
pub use summary::BatchSummary;
