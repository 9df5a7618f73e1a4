//! End-to-end batch tests.
//!
//! Drives `BatchOptimizer` over several symbols with a stub worker, real
//! JSON state and preset stores in a temp directory.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use grid_optimizer::batch::{
    BatchConfig, BatchControl, BatchError, BatchObserver, BatchOptimizer, BatchSummary,
    JsonPresetStore, JsonStateStore, PresetStore, PriceSeriesSource, SourceError, StateStore,
};
use grid_optimizer::metrics::TradeMetrics;
use grid_optimizer::parallel::{Dispatcher, ParallelConfig};
use grid_optimizer::params::{Direction, NumericRange, ParameterRanges, ParameterSet, Timeframe};
use grid_optimizer::ranking::FilterCriteria;
use grid_optimizer::worker::{CostModel, OptimizationResult, PriceSeries, Worker, WorkerError};

// =============================================================================
// Stubs
// =============================================================================

/// Good metrics for A, C and E; a 60% win rate for everything else.
#[derive(Default)]
struct SymbolWorker {
    evaluations: AtomicUsize,
}

impl SymbolWorker {
    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl Worker for SymbolWorker {
    fn evaluate(
        &self,
        params: &ParameterSet,
        series: &PriceSeries,
        _cost: &CostModel,
    ) -> Result<OptimizationResult, WorkerError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        let win_rate = match series.symbol() {
            "A" | "C" | "E" => dec!(80),
            _ => dec!(60),
        };
        let metrics = TradeMetrics {
            total_trades: 50,
            win_rate,
            max_drawdown: dec!(10),
            profit_factor: dec!(2.5),
            sharpe_ratio: dec!(1.8),
            ..TradeMetrics::default()
        };
        Ok(OptimizationResult::from_metrics(*params, &metrics, None))
    }
}

struct EmptySeries;

impl PriceSeriesSource for EmptySeries {
    fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<PriceSeries, SourceError> {
        Ok(PriceSeries::new(symbol, timeframe, Vec::new()))
    }
}

/// Stops the batch when unit `at` starts.
struct StopAt {
    at: usize,
    control: BatchControl,
}

impl BatchObserver for StopAt {
    fn on_progress(&self, current: usize, _total: usize, _symbol: &str) {
        if current == self.at {
            self.control.stop();
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Ranges with one point per axis, so each unit costs two evaluations.
fn pinned_ranges() -> ParameterRanges {
    let pin = |v: f64| NumericRange::new(v, v);
    ParameterRanges {
        atr_mult: pin(1.5),
        trail_start_r: pin(1.0),
        trail_dist_r: pin(0.2),
        entry_validity_hours: pin(24.0),
        leverage: pin(3.0),
        filter_tf: vec![Timeframe::H4],
        direction: vec![Direction::Both],
    }
}

fn config(symbols: &[&str]) -> BatchConfig {
    BatchConfig {
        exchange: "bybit".to_string(),
        symbols: symbols.iter().map(ToString::to_string).collect(),
        timeframes: vec![Timeframe::H1],
        filter: FilterCriteria {
            min_win_rate: dec!(70),
            max_drawdown: dec!(20),
            min_trades: 30,
        },
        ranges: pinned_ranges(),
        ..BatchConfig::default()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    dispatcher: Dispatcher,
    worker: Arc<SymbolWorker>,
    states: JsonStateStore,
    presets: JsonPresetStore,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let states = JsonStateStore::new(dir.path().join("state.json"));
        let presets = JsonPresetStore::new(dir.path().join("presets"));
        let dispatcher = Dispatcher::with_workers(ParallelConfig::default(), 2).unwrap();
        Self {
            _dir: dir,
            dispatcher,
            worker: Arc::new(SymbolWorker::default()),
            states,
            presets,
        }
    }

    fn run(&self, config: BatchConfig) -> Result<BatchSummary, BatchError> {
        self.run_with(config, None)
    }

    fn run_with(
        &self,
        config: BatchConfig,
        stop_at: Option<usize>,
    ) -> Result<BatchSummary, BatchError> {
        let worker: Arc<dyn Worker> = self.worker.clone();
        let batch = BatchOptimizer::new(
            &self.dispatcher,
            worker,
            &EmptySeries,
            &self.states,
            &self.presets,
            config,
        )?;
        match stop_at {
            Some(at) => {
                let control = BatchControl::new();
                let observer = StopAt {
                    at,
                    control: control.clone(),
                };
                batch.with_control(control).with_observer(&observer).run()
            }
            None => batch.run(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn five_symbol_batch_accepts_three_and_reports_win_rate_failures() {
    let fixture = Fixture::new();
    let summary = fixture.run(config(&["A", "B", "C", "D", "E"])).unwrap();

    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.rejected_count, 2);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(summary.completed_units, 5);
    assert!(!summary.stopped);

    assert_eq!(summary.failed_symbol_names(), vec!["B", "D"]);
    for failure in &summary.failures {
        assert_eq!(failure.reasons.len(), 1);
        assert!(failure.reasons[0].contains("win rate"), "{:?}", failure.reasons);
    }

    let names = fixture.presets.list().unwrap();
    assert_eq!(names, vec!["bybit_A_1h", "bybit_C_1h", "bybit_E_1h"]);
    let preset = fixture.presets.load("bybit_C_1h").unwrap().unwrap();
    assert_eq!(preset.result.win_rate, dec!(80));
    assert_eq!(preset.params.leverage(), 3);

    let state = fixture.states.load().unwrap().unwrap();
    assert!(state.finished);
    assert_eq!(state.success_count, 3);
    assert_eq!(state.current_symbol.as_deref(), Some("E"));
}

#[test]
fn every_violated_criterion_is_reported() {
    struct PoorWorker;
    impl Worker for PoorWorker {
        fn evaluate(
            &self,
            params: &ParameterSet,
            _series: &PriceSeries,
            _cost: &CostModel,
        ) -> Result<OptimizationResult, WorkerError> {
            let metrics = TradeMetrics {
                total_trades: 12,
                win_rate: dec!(55),
                max_drawdown: dec!(35),
                ..TradeMetrics::default()
            };
            Ok(OptimizationResult::from_metrics(*params, &metrics, None))
        }
    }

    let fixture = Fixture::new();
    let batch = BatchOptimizer::new(
        &fixture.dispatcher,
        Arc::new(PoorWorker),
        &EmptySeries,
        &fixture.states,
        &fixture.presets,
        config(&["A"]),
    )
    .unwrap();
    let summary = batch.run().unwrap();

    let reasons = &summary.failures[0].reasons;
    assert_eq!(reasons.len(), 3);
    assert!(reasons[0].starts_with("win rate"));
    assert!(reasons[1].starts_with("max drawdown"));
    assert!(reasons[2].starts_with("trades"));
}

#[test]
fn resume_after_completion_runs_nothing() {
    let fixture = Fixture::new();
    let first = fixture.run(config(&["A", "B", "C", "D", "E"])).unwrap();
    let evaluations = fixture.worker.evaluations();
    assert!(evaluations > 0);

    let second = fixture.run(config(&["A", "B", "C", "D", "E"])).unwrap();
    assert_eq!(fixture.worker.evaluations(), evaluations);
    assert_eq!(second.units_run, 0);
    assert_eq!(second.success_count, first.success_count);
    assert_eq!(second.failures, first.failures);
}

#[test]
fn stop_persists_and_resume_continues() {
    let fixture = Fixture::new();

    let stopped = fixture
        .run_with(config(&["A", "B", "C", "D", "E"]), Some(2))
        .unwrap();
    assert!(stopped.stopped);
    assert_eq!(stopped.completed_units, 2);
    assert_eq!(stopped.units_run, 2);

    let state = fixture.states.load().unwrap().unwrap();
    assert_eq!(state.completed_units, 2);
    assert_eq!(state.current_symbol.as_deref(), Some("B"));
    assert!(!state.finished);

    let resumed = fixture.run(config(&["A", "B", "C", "D", "E"])).unwrap();
    assert!(!resumed.stopped);
    assert_eq!(resumed.units_run, 3);
    assert_eq!(resumed.success_count, 3);
    assert_eq!(resumed.failed_symbol_names(), vec!["B", "D"]);
}

#[test]
fn fresh_run_ignores_stored_state() {
    let fixture = Fixture::new();
    fixture.run(config(&["A", "B"])).unwrap();
    let evaluations = fixture.worker.evaluations();

    let fresh = BatchConfig {
        resume: false,
        ..config(&["A", "B"])
    };
    let summary = fixture.run(fresh).unwrap();
    assert_eq!(summary.units_run, 2);
    assert_eq!(fixture.worker.evaluations(), evaluations * 2);
}

#[test]
fn changed_symbol_list_needs_permission() {
    let fixture = Fixture::new();
    fixture
        .run_with(config(&["A", "B", "C", "D", "E"]), Some(3))
        .unwrap();

    let changed = config(&["A", "B", "X", "D", "E"]);
    assert!(matches!(
        fixture.run(changed.clone()),
        Err(BatchError::SymbolListChanged { .. })
    ));

    let allowed = BatchConfig {
        allow_symbol_list_change: true,
        ..changed
    };
    let summary = fixture.run(allowed).unwrap();
    // C is gone from the list, so resume falls back to the completed count.
    assert_eq!(summary.units_run, 2);
    assert_eq!(summary.completed_units, 5);
}

#[test]
fn invalid_configuration_fails_before_evaluation() {
    let fixture = Fixture::new();
    let inverted = BatchConfig {
        filter: FilterCriteria {
            max_drawdown: Decimal::NEGATIVE_ONE,
            ..FilterCriteria::default()
        },
        ..config(&["A"])
    };
    assert!(matches!(
        fixture.run(inverted),
        Err(BatchError::InvalidCriteria(_))
    ));
    assert!(matches!(fixture.run(config(&[])), Err(BatchError::EmptySymbols)));
    assert_eq!(fixture.worker.evaluations(), 0);
}
