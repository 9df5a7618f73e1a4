//! Grid -> dispatcher -> strategy worker -> ranking, end to end.
//!
//! Uses a deterministic in-process strategy engine instead of a backtester.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use grid_optimizer::grid::ParameterGrid;
use grid_optimizer::metrics::Trade;
use grid_optimizer::parallel::{Dispatcher, ParallelConfig};
use grid_optimizer::params::{Direction, ParamKey, ParameterSet, Timeframe, TradeSide};
use grid_optimizer::ranking::{FilterMode, RankMetric, RankedResultSet};
use grid_optimizer::worker::{
    CostModel, PriceSeries, StrategyEngine, StrategyError, StrategyWorker, Worker, WorkerLimits,
};

// =============================================================================
// Stubs
// =============================================================================

/// Fixed trade list. Stop multiples above 2.5 fail, by panicking under a 12h
/// filter and by error otherwise.
struct ScriptedEngine;

impl StrategyEngine for ScriptedEngine {
    fn run(
        &self,
        params: &ParameterSet,
        _series: &PriceSeries,
        _cost: &CostModel,
    ) -> Result<Vec<Trade>, StrategyError> {
        if params.atr_mult() > 2.5 {
            if params.filter_tf() == Timeframe::H12 {
                panic!("indicator buffer underflow");
            }
            return Err(StrategyError::new("stop too wide"));
        }
        Ok(vec![
            Trade::new(TradeSide::Long, dec!(2)),
            Trade::new(TradeSide::Short, dec!(-1)),
            Trade::new(TradeSide::Long, dec!(1)),
            Trade::new(TradeSide::Short, dec!(3)),
        ])
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn grid() -> ParameterGrid {
    ParameterGrid::builder()
        .add_float_param(ParamKey::AtrMult, vec![1.5, 3.0])
        .add_float_param(ParamKey::TrailStartR, vec![1.0])
        .add_float_param(ParamKey::TrailDistR, vec![0.2])
        .add_float_param(ParamKey::EntryValidityHours, vec![24.0])
        .add_int_param(ParamKey::Leverage, vec![1, 3])
        .add_timeframes(vec![Timeframe::H4, Timeframe::H12])
        .add_directions(vec![Direction::Long, Direction::Short, Direction::Both])
        .build()
        .unwrap()
}

fn worker() -> Arc<dyn Worker> {
    Arc::new(StrategyWorker::new(
        Arc::new(ScriptedEngine),
        WorkerLimits::default(),
    ))
}

fn run(workers: usize) -> (RankedResultSet, usize, usize) {
    let dispatcher = Dispatcher::with_workers(ParallelConfig::default(), workers).unwrap();
    let series = PriceSeries::new("ETHUSDT", Timeframe::H1, Vec::new());
    let outcome = dispatcher
        .dispatch(
            worker(),
            grid().combinations(),
            &series,
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        )
        .unwrap();
    let failed = outcome.failed.len();
    let rejected = outcome.rejected.len();
    let ranked = RankedResultSet::new(
        outcome.into_submission_order(),
        &FilterMode::Unfiltered,
        RankMetric::TotalReturn,
    );
    (ranked, failed, rejected)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn engine_failures_are_isolated_per_combination() {
    let (ranked, failed, rejected) = run(4);

    // 2 x 1 x 1 x 1 x 2 x 2 x 3 = 24; every 3.0 combination fails.
    assert_eq!(failed, 12);
    assert_eq!(rejected, 0);
    assert_eq!(ranked.len(), 12);
    assert!(ranked.as_slice().iter().all(|r| r.params.atr_mult() < 2.5));
}

#[test]
fn direction_and_leverage_shape_the_ranking() {
    let (ranked, _, _) = run(4);

    let Some(best) = ranked.best() else {
        panic!("nothing ranked");
    };
    // Both sides: (2 - 1 + 1 + 3) * 3
    assert_eq!(best.params.direction(), Direction::Both);
    assert_eq!(best.params.leverage(), 3);
    assert_eq!(best.total_return(), dec!(15));
    assert_eq!(best.total_trades, 4);

    // Ties on return keep grid order, so the 4h filter comes first.
    assert_eq!(best.params.filter_tf(), Timeframe::H4);

    let long_only = ranked
        .as_slice()
        .iter()
        .find(|r| r.params.direction() == Direction::Long && r.params.leverage() == 1)
        .unwrap();
    assert_eq!(long_only.total_trades, 2);
    assert_eq!(long_only.win_rate, dec!(100));
    assert_eq!(long_only.total_return(), dec!(3));
}

#[test]
fn pool_size_does_not_change_the_ranking() {
    let (single, ..) = run(1);
    let (pooled, ..) = run(4);
    assert_eq!(single.as_slice(), pooled.as_slice());
}
