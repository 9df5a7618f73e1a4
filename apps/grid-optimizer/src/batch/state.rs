//! Resumable batch progress.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PersistenceError;
use super::persist::{read_json, write_json_atomic};
use crate::params::Timeframe;
use crate::ranking::FilterCriteria;

/// A unit that did not produce a preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSymbol {
    /// Symbol.
    pub symbol: String,
    /// Timeframe.
    pub timeframe: Timeframe,
    /// Every reason, verbatim.
    pub reasons: Vec<String>,
}

/// Progress snapshot of a batch run.
///
/// Units run symbol-major: every timeframe of a symbol before the next
/// symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationState {
    /// Exchange label.
    pub exchange: String,
    /// Timeframes per symbol.
    pub timeframes: Vec<Timeframe>,
    /// Symbol list the run was started with.
    pub symbols: Vec<String>,
    /// Number of symbols.
    pub total_symbols: usize,
    /// Symbols with every timeframe done.
    pub completed: usize,
    /// Number of units.
    pub total_units: usize,
    /// Units done.
    pub completed_units: usize,
    /// Symbol of the last completed unit.
    pub current_symbol: Option<String>,
    /// Timeframe of the last completed unit.
    pub current_timeframe: Option<Timeframe>,
    /// Units that produced a preset.
    pub success_count: usize,
    /// Units whose best result missed the criteria.
    pub rejected_count: usize,
    /// Units without a result.
    pub failed_count: usize,
    /// Rejected and failed units with reasons.
    pub failed_symbols: Vec<FailedSymbol>,
    /// Acceptance thresholds of the run.
    pub thresholds: FilterCriteria,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Last write.
    pub last_update: DateTime<Utc>,
    /// Whether every unit is done.
    pub finished: bool,
}

impl OptimizationState {
    /// Fresh state for a new run.
    #[must_use]
    pub fn new(
        exchange: &str,
        symbols: &[String],
        timeframes: &[Timeframe],
        thresholds: FilterCriteria,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange: exchange.to_string(),
            timeframes: timeframes.to_vec(),
            symbols: symbols.to_vec(),
            total_symbols: symbols.len(),
            completed: 0,
            total_units: symbols.len() * timeframes.len(),
            completed_units: 0,
            current_symbol: None,
            current_timeframe: None,
            success_count: 0,
            rejected_count: 0,
            failed_count: 0,
            failed_symbols: Vec::new(),
            thresholds,
            started_at: now,
            last_update: now,
            finished: false,
        }
    }

    /// Index of the next unit to run against `symbols`.
    ///
    /// Locates the last completed unit by symbol and timeframe; if the
    /// symbol is gone, falls back to the completed-unit count.
    #[must_use]
    pub fn resume_position(&self, symbols: &[String]) -> usize {
        let per_symbol = self.timeframes.len().max(1);
        let total = symbols.len() * self.timeframes.len();

        let located = self.current_symbol.as_ref().and_then(|current| {
            let symbol_index = symbols.iter().position(|s| s == current)?;
            let tf_index = self
                .current_timeframe
                .and_then(|tf| self.timeframes.iter().position(|t| *t == tf))
                .unwrap_or(per_symbol - 1);
            Some(symbol_index * per_symbol + tf_index + 1)
        });

        located.unwrap_or(self.completed_units).min(total)
    }

    /// Record one finished unit.
    pub fn record_unit(&mut self, symbol: &str, timeframe: Timeframe, now: DateTime<Utc>) {
        self.completed_units += 1;
        self.completed = self.completed_units / self.timeframes.len().max(1);
        self.current_symbol = Some(symbol.to_string());
        self.current_timeframe = Some(timeframe);
        self.last_update = now;
    }

    /// Whether `symbols` differs from the list the run started with.
    #[must_use]
    pub fn symbols_changed(&self, symbols: &[String]) -> bool {
        self.symbols != symbols
    }
}

/// Durable storage for [`OptimizationState`].
#[cfg_attr(test, mockall::automock)]
pub trait StateStore: Send + Sync {
    /// Load the stored state, `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns error if the state exists but cannot be read.
    fn load(&self) -> Result<Option<OptimizationState>, PersistenceError>;

    /// Durably store `state`.
    ///
    /// # Errors
    ///
    /// Returns error if the write cannot be completed.
    fn save(&self, state: &OptimizationState) -> Result<(), PersistenceError>;
}

/// JSON file state store at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    /// Store at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Option<OptimizationState>, PersistenceError> {
        read_json(&self.path)
    }

    fn save(&self, state: &OptimizationState) -> Result<(), PersistenceError> {
        write_json_atomic(&self.path, state)
    }
}
