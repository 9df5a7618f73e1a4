//! Resumable symbol x timeframe batch driver.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{Level, info, span, warn};

use super::{
    BatchControl, BatchError, BatchObserver, BatchSummary, FailedSymbol, OptimizationState,
    Preset, PresetStore, PriceSeriesSource, StateStore, UnitStatus,
};
use crate::coarse_to_fine::{
    CoarseToFineConfig, CoarseToFineOptimizer, CoarseToFineOutcome, OptimizerError,
};
use crate::grid::{GridBuilder, GridConstraints, GridError, GridMode};
use crate::observability::{record_batch_unit, update_batch_progress};
use crate::parallel::Dispatcher;
use crate::params::{ParameterRanges, Timeframe};
use crate::ranking::FilterCriteria;
use crate::worker::{CostModel, PriceSeries, Worker};

/// Reason recorded for a unit where nothing survived evaluation.
pub const NO_RESULT_REASON: &str = "no result";

/// How each unit is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Three-phase adaptive search over the configured ranges.
    #[default]
    CoarseToFine,
    /// Fixed quick grid.
    Quick,
    /// Fixed standard grid.
    Standard,
    /// Fixed deep grid.
    Deep,
    /// Fixed adaptive-density grid.
    Adaptive,
}

impl SearchMode {
    /// Fixed grid mode, `None` for coarse-to-fine.
    #[must_use]
    pub const fn grid_mode(self) -> Option<GridMode> {
        match self {
            Self::CoarseToFine => None,
            Self::Quick => Some(GridMode::Quick),
            Self::Standard => Some(GridMode::Standard),
            Self::Deep => Some(GridMode::Deep),
            Self::Adaptive => Some(GridMode::Adaptive),
        }
    }

    /// Config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self.grid_mode() {
            None => "coarse_to_fine",
            Some(mode) => mode.as_str(),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarse_to_fine" | "coarse-to-fine" => Ok(Self::CoarseToFine),
            other => match other.parse::<GridMode>()? {
                GridMode::Quick => Ok(Self::Quick),
                GridMode::Standard => Ok(Self::Standard),
                GridMode::Deep => Ok(Self::Deep),
                GridMode::Adaptive => Ok(Self::Adaptive),
            },
        }
    }
}

/// What a batch run covers and how.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// Exchange label, part of preset names.
    pub exchange: String,
    /// Symbols, in run order.
    pub symbols: Vec<String>,
    /// Timeframes per symbol, in run order.
    pub timeframes: Vec<Timeframe>,
    /// Acceptance thresholds.
    pub filter: FilterCriteria,
    /// Search per unit.
    pub search: SearchMode,
    /// Coarse-to-fine input ranges.
    pub ranges: ParameterRanges,
    /// Limits on fixed grids.
    pub constraints: GridConstraints,
    /// Coarse-to-fine tuning.
    pub tuning: CoarseToFineConfig,
    /// Continue a stored run instead of starting over.
    pub resume: bool,
    /// Resume even when the symbol list differs from the stored run.
    pub allow_symbol_list_change: bool,
    /// Failures listed verbatim in the summary.
    pub summary_failure_limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            exchange: "bybit".to_string(),
            symbols: Vec::new(),
            timeframes: vec![Timeframe::H1],
            filter: FilterCriteria::default(),
            search: SearchMode::default(),
            ranges: ParameterRanges::default(),
            constraints: GridConstraints::default(),
            tuning: CoarseToFineConfig::default(),
            resume: true,
            allow_symbol_list_change: false,
            summary_failure_limit: 20,
        }
    }
}

impl BatchConfig {
    /// Fail fast on configurations that cannot run.
    ///
    /// # Errors
    ///
    /// Returns error for empty symbol or timeframe lists, unusable
    /// thresholds, or invalid ranges.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.symbols.is_empty() {
            return Err(BatchError::EmptySymbols);
        }
        if self.timeframes.is_empty() {
            return Err(BatchError::EmptyTimeframes);
        }
        self.filter.validate()?;
        self.ranges.validate().map_err(GridError::from)?;
        Ok(())
    }
}

/// Per-unit verdict.
enum UnitOutcome {
    Finished(UnitStatus),
    Aborted,
}

/// Runs the search over every symbol x timeframe unit.
pub struct BatchOptimizer<'a> {
    dispatcher: &'a Dispatcher,
    worker: Arc<dyn Worker>,
    source: &'a dyn PriceSeriesSource,
    state_store: &'a dyn StateStore,
    preset_store: &'a dyn PresetStore,
    config: BatchConfig,
    cost: CostModel,
    control: BatchControl,
    observer: Option<&'a dyn BatchObserver>,
}

impl fmt::Debug for BatchOptimizer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptimizer")
            .field("config", &self.config)
            .field("cost", &self.cost)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

impl<'a> BatchOptimizer<'a> {
    /// Create a driver.
    ///
    /// # Errors
    ///
    /// Returns error if `config` is invalid.
    pub fn new(
        dispatcher: &'a Dispatcher,
        worker: Arc<dyn Worker>,
        source: &'a dyn PriceSeriesSource,
        state_store: &'a dyn StateStore,
        preset_store: &'a dyn PresetStore,
        config: BatchConfig,
    ) -> Result<Self, BatchError> {
        config.validate()?;
        Ok(Self {
            dispatcher,
            worker,
            source,
            state_store,
            preset_store,
            config,
            cost: CostModel::default(),
            control: BatchControl::new(),
            observer: None,
        })
    }

    /// Use `cost` for every evaluation.
    #[must_use]
    pub const fn with_cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    /// Report events to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn BatchObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Drive this batch through `control`.
    #[must_use]
    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    /// Handle to pause, resume or stop the run.
    #[must_use]
    pub fn control(&self) -> BatchControl {
        self.control.clone()
    }

    /// Run every remaining unit.
    ///
    /// State is written after every unit. A stop between units persists
    /// state and returns a summary with `stopped` set.
    ///
    /// # Errors
    ///
    /// Returns error on configuration problems, state or preset write
    /// failures, or a broken worker pool.
    pub fn run(&self) -> Result<BatchSummary, BatchError> {
        let config = &self.config;
        let _span = span!(Level::INFO, "batch", exchange = %config.exchange).entered();

        let (mut state, start) = self.initial_state()?;
        let units: Vec<(&str, Timeframe)> = config
            .symbols
            .iter()
            .flat_map(|s| config.timeframes.iter().map(move |tf| (s.as_str(), *tf)))
            .collect();
        let total = units.len();

        info!(
            symbols = config.symbols.len(),
            timeframes = config.timeframes.len(),
            total_units = total,
            start,
            search = %config.search,
            "Starting batch"
        );
        self.status(&format!(
            "Batch {}: {} units, starting at {}",
            config.exchange,
            total,
            start + 1
        ));

        let mut units_run = 0;
        for (index, (symbol, timeframe)) in units.iter().copied().enumerate().skip(start) {
            if self.control.wait_if_paused() {
                return self.stop(&state, units_run);
            }

            if let Some(observer) = self.observer {
                observer.on_progress(index + 1, total, symbol);
            }
            self.status(&format!("[{}/{}] {symbol} {timeframe}", index + 1, total));

            let status = match self.run_unit(&mut state, symbol, timeframe)? {
                UnitOutcome::Finished(status) => status,
                UnitOutcome::Aborted => return self.stop(&state, units_run),
            };
            units_run += 1;

            state.record_unit(symbol, timeframe, Utc::now());
            state.finished = index + 1 == total;
            self.state_store.save(&state)?;

            record_batch_unit(status.as_str());
            update_batch_progress(state.completed_units, total);
            if let Some(observer) = self.observer {
                observer.on_unit(symbol, timeframe, status);
                observer.on_tally(state.success_count, state.rejected_count, state.failed_count);
            }
        }

        if !state.finished {
            state.finished = true;
            state.last_update = Utc::now();
            self.state_store.save(&state)?;
        }

        let summary =
            BatchSummary::from_state(&state, config.summary_failure_limit, units_run, false);
        info!(
            units_run,
            success = summary.success_count,
            rejected = summary.rejected_count,
            failed = summary.failed_count,
            "Batch complete"
        );
        self.status(&format!(
            "Batch complete: {} accepted, {} rejected, {} failed",
            summary.success_count, summary.rejected_count, summary.failed_count
        ));
        Ok(summary)
    }

    /// Stored state to continue, or a fresh one, and the first unit to run.
    fn initial_state(&self) -> Result<(OptimizationState, usize), BatchError> {
        let config = &self.config;
        let stored = if config.resume {
            self.state_store.load()?
        } else {
            None
        };

        let resumable = stored.filter(|state| {
            let same_run =
                state.exchange == config.exchange && state.timeframes == config.timeframes;
            if !same_run {
                info!("Stored state belongs to a different run, starting fresh");
            }
            same_run
        });

        if let Some(mut state) = resumable {
            if state.symbols_changed(&config.symbols) {
                if !config.allow_symbol_list_change {
                    return Err(BatchError::SymbolListChanged {
                        stored: state.symbols.len(),
                        configured: config.symbols.len(),
                    });
                }
                let start = state.resume_position(&config.symbols);
                warn!(
                    stored = state.symbols.len(),
                    configured = config.symbols.len(),
                    start,
                    "Symbol list changed, resuming by position"
                );
                state.symbols.clone_from(&config.symbols);
                state.total_symbols = config.symbols.len();
                state.total_units = config.symbols.len() * config.timeframes.len();
                state.completed_units = start;
                state.completed = start / config.timeframes.len();
                state.finished = start == state.total_units;
                return Ok((state, start));
            }

            let start = state.resume_position(&config.symbols);
            info!(
                completed_units = state.completed_units,
                current_symbol = ?state.current_symbol,
                "Resuming batch"
            );
            return Ok((state, start));
        }

        let state = OptimizationState::new(
            &config.exchange,
            &config.symbols,
            &config.timeframes,
            config.filter.clone(),
            Utc::now(),
        );
        self.state_store.save(&state)?;
        Ok((state, 0))
    }

    fn run_unit(
        &self,
        state: &mut OptimizationState,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<UnitOutcome, BatchError> {
        let _span = span!(Level::INFO, "batch_unit", symbol, timeframe = %timeframe).entered();
        if let Some(observer) = self.observer {
            observer.on_unit(symbol, timeframe, UnitStatus::Running);
        }

        let series = match self.source.load(symbol, timeframe) {
            Ok(series) => series,
            Err(e) => {
                warn!(error = %e, "Price data unavailable");
                self.record_failure(state, symbol, timeframe, vec![e.to_string()]);
                return Ok(UnitOutcome::Finished(UnitStatus::Failed));
            }
        };

        let searched = self.search(&series);
        if self.control.is_aborted() {
            warn!("Unit aborted, it will run again on resume");
            return Ok(UnitOutcome::Aborted);
        }

        let outcome = match searched {
            Ok(outcome) => outcome,
            Err(OptimizerError::NoViableResult { phase }) => {
                warn!(phase = %phase, "No result survived evaluation");
                self.record_failure(state, symbol, timeframe, vec![NO_RESULT_REASON.to_string()]);
                return Ok(UnitOutcome::Finished(UnitStatus::Failed));
            }
            Err(e) => return Err(BatchError::Search(e)),
        };

        let best = &outcome.best;
        let violations = self.config.filter.violations(best);
        if violations.is_empty() {
            let preset = Preset::from_result(
                &self.config.exchange,
                symbol,
                timeframe,
                best,
                Utc::now(),
            );
            self.preset_store.save(&preset.name(), &preset)?;
            state.success_count += 1;
            info!(
                preset = %preset.name(),
                win_rate = %best.win_rate,
                max_drawdown = %best.max_drawdown,
                trades = best.total_trades,
                grade = %best.grade,
                evaluations = outcome.total_evaluations,
                "Unit accepted"
            );
            return Ok(UnitOutcome::Finished(UnitStatus::Accepted));
        }

        let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
        info!(reasons = ?reasons, "Unit rejected");
        state.rejected_count += 1;
        state.failed_symbols.push(FailedSymbol {
            symbol: symbol.to_string(),
            timeframe,
            reasons,
        });
        Ok(UnitOutcome::Finished(UnitStatus::Rejected))
    }

    fn search(&self, series: &PriceSeries) -> Result<CoarseToFineOutcome, OptimizerError> {
        let optimizer = CoarseToFineOptimizer::new(
            self.dispatcher,
            self.config.ranges.clone(),
            self.config.tuning.clone(),
        )?;
        let cancel = self.control.cancellation();
        match self.config.search.grid_mode() {
            None => optimizer.run(Arc::clone(&self.worker), series, &self.cost, cancel, None),
            Some(mode) => {
                let grid =
                    GridBuilder::generate(mode, series.timeframe(), &self.config.constraints)?;
                optimizer.run_grid(&grid, Arc::clone(&self.worker), series, &self.cost, cancel, None)
            }
        }
    }

    fn record_failure(
        &self,
        state: &mut OptimizationState,
        symbol: &str,
        timeframe: Timeframe,
        reasons: Vec<String>,
    ) {
        state.failed_count += 1;
        state.failed_symbols.push(FailedSymbol {
            symbol: symbol.to_string(),
            timeframe,
            reasons,
        });
        if let Some(observer) = self.observer {
            observer.on_status(&format!("{symbol} {timeframe} failed"));
        }
    }

    fn stop(&self, state: &OptimizationState, units_run: usize) -> Result<BatchSummary, BatchError> {
        self.state_store.save(state)?;
        info!(
            completed_units = state.completed_units,
            units_run, "Batch stopped, state saved"
        );
        self.status("Batch stopped");
        Ok(BatchSummary::from_state(
            state,
            self.config.summary_failure_limit,
            units_run,
            true,
        ))
    }

    fn status(&self, message: &str) {
        if let Some(observer) = self.observer {
            observer.on_status(message);
        }
    }
}
