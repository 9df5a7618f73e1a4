//! Coarse-to-fine search against synthetic score surfaces.
//!
//! Only the stop-loss multiple varies; every other axis is pinned so the
//! phase grids are small enough to reason about by hand.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use grid_optimizer::coarse_to_fine::{
    CoarseToFineConfig, CoarseToFineOptimizer, OptimizerError, Phase,
};
use grid_optimizer::grid::{GridBuilder, GridConstraints, GridMode};
use grid_optimizer::metrics::TradeMetrics;
use grid_optimizer::parallel::{Dispatcher, ParallelConfig};
use grid_optimizer::params::{Direction, NumericRange, ParameterRanges, ParameterSet, Timeframe};
use grid_optimizer::worker::{CostModel, OptimizationResult, PriceSeries, Worker, WorkerError};

// =============================================================================
// Stubs
// =============================================================================

/// Sharpe ratio as a function of the stop-loss multiple alone.
struct SurfaceWorker {
    surface: fn(f64) -> f64,
}

impl Worker for SurfaceWorker {
    fn evaluate(
        &self,
        params: &ParameterSet,
        _series: &PriceSeries,
        _cost: &CostModel,
    ) -> Result<OptimizationResult, WorkerError> {
        let sharpe = Decimal::from_f64_retain((self.surface)(params.atr_mult()))
            .unwrap_or_default()
            .round_dp(2);
        let metrics = TradeMetrics {
            total_trades: 40,
            win_rate: dec!(75),
            max_drawdown: dec!(12),
            profit_factor: dec!(2),
            sharpe_ratio: sharpe,
            ..TradeMetrics::default()
        };
        Ok(OptimizationResult::from_metrics(*params, &metrics, None))
    }
}

/// Single peak at 1.7.
fn peak(atr_mult: f64) -> f64 {
    10.0 - 10.0 * (atr_mult - 1.7).powi(2)
}

fn flat(_atr_mult: f64) -> f64 {
    1.0
}

// =============================================================================
// Helpers
// =============================================================================

fn ranges() -> ParameterRanges {
    let pin = |v: f64| NumericRange::new(v, v);
    ParameterRanges {
        atr_mult: NumericRange::new(1.0, 3.0),
        trail_start_r: pin(0.5),
        trail_dist_r: pin(0.1),
        entry_validity_hours: pin(24.0),
        leverage: pin(1.0),
        filter_tf: vec![Timeframe::H4],
        direction: vec![Direction::Both],
    }
}

fn dispatcher() -> Dispatcher {
    Dispatcher::with_workers(ParallelConfig::default(), 3).unwrap()
}

fn series() -> PriceSeries {
    PriceSeries::new("BTCUSDT", Timeframe::H1, Vec::new())
}

fn worker(surface: fn(f64) -> f64) -> Arc<dyn Worker> {
    Arc::new(SurfaceWorker { surface })
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn single_peak_converges_through_ultra_fine() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();

    let outcome = optimizer
        .run(
            worker(peak),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

    let [coarse, fine, ultra] = outcome.phases.as_slice() else {
        panic!("expected three phases, got {:?}", outcome.phases);
    };

    // {1.0, 2.0, 3.0}
    assert_eq!(coarse.phase, Phase::Coarse);
    assert_eq!(coarse.grid_size, 3);
    assert_eq!(coarse.best_score, Some(dec!(9.1)));

    // 2.0 +/- 50% in five points: {1.0, 1.5, 2.0, 2.5, 3.0}
    assert_eq!(fine.phase, Phase::Fine);
    assert_eq!(fine.grid_size, 5);
    assert_eq!(fine.best_score, Some(dec!(9.6)));

    // (9.6 - 9.1) / 9.1 clears the 5% bar
    let gain = outcome.improvement.unwrap();
    assert!((gain - 0.0549).abs() < 1e-3, "improvement {gain}");
    assert!(outcome.ran_ultra_fine);

    // 1.5 +/- 20% in seven points: {1.2, 1.3, ..., 1.8}
    assert_eq!(ultra.phase, Phase::UltraFine);
    assert_eq!(ultra.grid_size, 7);
    assert!((outcome.best.params.atr_mult() - 1.7).abs() < 1e-9);
    assert_eq!(outcome.best.sharpe_ratio, dec!(10));
    assert_eq!(outcome.final_phase(), Phase::UltraFine);
    assert_eq!(outcome.total_evaluations, 3 + 5 + 7);
    assert!(!outcome.cancelled);
}

#[test]
fn fine_best_lands_near_the_peak() {
    let dispatcher = dispatcher();
    let config = CoarseToFineConfig {
        improvement_threshold: 1.0,
        ..CoarseToFineConfig::default()
    };
    let optimizer = CoarseToFineOptimizer::new(&dispatcher, ranges(), config).unwrap();

    let outcome = optimizer
        .run(
            worker(peak),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

    assert_eq!(outcome.phases.len(), 2);
    assert!(!outcome.ran_ultra_fine);
    assert!((outcome.best.params.atr_mult() - 1.7).abs() <= 0.25);
}

#[test]
fn flat_surface_stops_after_fine() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();

    let outcome = optimizer
        .run(
            worker(flat),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

    assert_eq!(outcome.phases.len(), 2);
    assert_eq!(outcome.improvement, Some(0.0));
    assert!(!outcome.ran_ultra_fine);
    assert_eq!(outcome.final_phase(), Phase::Fine);
    // Ties keep submission order, so the lowest multiple wins.
    assert!((outcome.best.params.atr_mult() - 1.0).abs() < 1e-9);
}

#[test]
fn repeated_runs_are_identical() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();
    let run = || {
        optimizer
            .run(
                worker(peak),
                &series(),
                &CostModel::default(),
                &CancellationToken::new(),
                None,
            )
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.best, second.best);
    assert_eq!(first.improvement, second.improvement);
    assert_eq!(first.total_evaluations, second.total_evaluations);
}

#[test]
fn cancelled_before_start_has_no_result() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = optimizer.run(worker(peak), &series(), &CostModel::default(), &cancel, None);
    assert_eq!(
        outcome.err(),
        Some(OptimizerError::NoViableResult {
            phase: Phase::Coarse
        })
    );
}

#[test]
fn progress_messages_carry_the_phase() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();
    let seen: Mutex<Vec<(u64, u64, String)>> = Mutex::new(Vec::new());
    let observer = |completed: u64, total: u64, message: &str| {
        seen.lock().unwrap().push((completed, total, message.to_string()));
    };

    optimizer
        .run(
            worker(peak),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            Some(&observer),
        )
        .unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 3 + 5 + 7);
    assert!(seen[..3].iter().all(|(_, total, m)| *total == 3 && m.starts_with("[coarse]")));
    assert!(seen[3..8].iter().all(|(_, total, m)| *total == 5 && m.starts_with("[fine]")));
    assert!(seen[8..].iter().all(|(_, _, m)| m.starts_with("[ultra_fine]")));
    assert_eq!(seen[2].0, 3);
}

#[test]
fn fixed_grid_runs_as_a_single_phase() {
    let dispatcher = dispatcher();
    let optimizer =
        CoarseToFineOptimizer::new(&dispatcher, ranges(), CoarseToFineConfig::default()).unwrap();
    let grid =
        GridBuilder::generate(GridMode::Quick, Timeframe::H1, &GridConstraints::default()).unwrap();

    let outcome = optimizer
        .run_grid(
            &grid,
            worker(peak),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

    assert_eq!(outcome.phases.len(), 1);
    assert_eq!(outcome.final_phase(), Phase::Grid);
    assert_eq!(outcome.phases[0].grid_size, grid.total_combinations());
    // Quick offers 1.25 and 2.0; 2.0 sits closer to the peak.
    assert!((outcome.best.params.atr_mult() - 2.0).abs() < 1e-9);
}
