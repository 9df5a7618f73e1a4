//! Adaptive coarse-to-fine optimizer.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, span, warn};

use super::phase::{
    FINE_POINTS, FINE_RANGE, IMPROVEMENT_THRESHOLD, ULTRA_FINE_POINTS, ULTRA_FINE_RANGE,
};
use super::{OptimizerError, Phase, PhaseReport};
use crate::grid::{GridBuilder, GridError, ParameterGrid};
use crate::observability::record_phase;
use crate::parallel::{Dispatcher, ProgressObserver};
use crate::params::ParameterRanges;
use crate::ranking::{FilterCriteria, FilterMode, RankMetric, RankedResultSet};
use crate::worker::{CostModel, OptimizationResult, PriceSeries, Worker};

/// Tuning of an adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoarseToFineConfig {
    /// Score used to rank every phase.
    pub metric: RankMetric,
    /// Relative improvement that triggers UltraFine.
    pub improvement_threshold: f64,
    /// Skip combinations failing the interaction rules.
    pub validate_interactions: bool,
    /// Hard filter applied inside phases; `None` ranks every result.
    pub phase_filter: Option<FilterCriteria>,
    /// Fine phase points per numeric axis.
    pub fine_points: usize,
    /// Fine phase window factor.
    pub fine_range: f64,
    /// UltraFine phase points per numeric axis.
    pub ultra_fine_points: usize,
    /// UltraFine phase window factor.
    pub ultra_fine_range: f64,
}

impl Default for CoarseToFineConfig {
    fn default() -> Self {
        Self {
            metric: RankMetric::default(),
            improvement_threshold: IMPROVEMENT_THRESHOLD,
            validate_interactions: false,
            phase_filter: None,
            fine_points: FINE_POINTS,
            fine_range: FINE_RANGE,
            ultra_fine_points: ULTRA_FINE_POINTS,
            ultra_fine_range: ULTRA_FINE_RANGE,
        }
    }
}

/// Result of a search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseToFineOutcome {
    /// Final best result.
    pub best: OptimizationResult,
    /// Reports of the phases that ran, in order.
    pub phases: Vec<PhaseReport>,
    /// Coarse to Fine relative improvement, if Fine ran.
    pub improvement: Option<f64>,
    /// Whether the UltraFine phase ran.
    pub ran_ultra_fine: bool,
    /// Combinations handed to workers over all phases.
    pub total_evaluations: usize,
    /// Whether cancellation ended the run early.
    pub cancelled: bool,
}

impl CoarseToFineOutcome {
    /// Phase the final best came from.
    #[must_use]
    pub fn final_phase(&self) -> Phase {
        self.phases.last().map_or(Phase::Done, |p| p.phase)
    }
}

/// Relative improvement from `s1` to `s2`.
///
/// A negative baseline divides by its magnitude. A zero baseline gives
/// `+inf` when `s2` is positive and `0` otherwise.
#[must_use]
pub fn improvement(s1: Decimal, s2: Decimal) -> f64 {
    if s1.is_zero() {
        return if s2 > Decimal::ZERO { f64::INFINITY } else { 0.0 };
    }
    ((s2 - s1) / s1.abs()).to_f64().unwrap_or(0.0)
}

/// Per-run collaborators shared by every phase.
struct RunContext<'r> {
    worker: &'r Arc<dyn Worker>,
    series: &'r PriceSeries,
    cost: &'r CostModel,
    cancel: &'r CancellationToken,
    progress: Option<&'r dyn ProgressObserver>,
}

/// Adaptive grid search over one price series.
#[derive(Debug)]
pub struct CoarseToFineOptimizer<'a> {
    dispatcher: &'a Dispatcher,
    ranges: ParameterRanges,
    config: CoarseToFineConfig,
}

impl<'a> CoarseToFineOptimizer<'a> {
    /// Create an optimizer over `ranges`.
    ///
    /// # Errors
    ///
    /// Returns error if the ranges are invalid.
    pub fn new(
        dispatcher: &'a Dispatcher,
        ranges: ParameterRanges,
        config: CoarseToFineConfig,
    ) -> Result<Self, OptimizerError> {
        ranges.validate().map_err(GridError::from)?;
        Ok(Self {
            dispatcher,
            ranges,
            config,
        })
    }

    /// Run Coarse, Fine and, if Fine improved enough, UltraFine.
    ///
    /// # Errors
    ///
    /// Returns error if a grid cannot be built, dispatch breaks, or the
    /// Coarse phase ranks nothing.
    pub fn run(
        &self,
        worker: Arc<dyn Worker>,
        series: &PriceSeries,
        cost: &CostModel,
        cancel: &CancellationToken,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<CoarseToFineOutcome, OptimizerError> {
        let ctx = RunContext {
            worker: &worker,
            series,
            cost,
            cancel,
            progress,
        };
        let started = Instant::now();
        let mut phases = Vec::with_capacity(3);

        // Coarse
        let grid = GridBuilder::coarse(&self.ranges)?;
        let (coarse, report) = self.run_phase(Phase::Coarse, &grid, &ctx)?;
        phases.push(report);
        let Some(coarse_best) = coarse.best().cloned() else {
            return Err(OptimizerError::NoViableResult {
                phase: Phase::Coarse,
            });
        };
        let s1 = self.config.metric.score(&coarse_best);
        if cancel.is_cancelled() {
            return Ok(self.finish(coarse_best, phases, None, false, true, started));
        }

        // Fine
        let grid = GridBuilder::refine(
            &self.ranges,
            coarse.top_decile(),
            self.config.fine_points,
            self.config.fine_range,
        )?;
        drop(coarse);
        let (fine, report) = self.run_phase(Phase::Fine, &grid, &ctx)?;
        phases.push(report);
        let Some(fine_best) = fine.best().cloned() else {
            warn!("Fine phase ranked nothing, keeping coarse best");
            return Ok(self.finish(coarse_best, phases, None, false, cancel.is_cancelled(), started));
        };
        let s2 = self.config.metric.score(&fine_best);
        let gain = improvement(s1, s2);

        info!(
            s1 = %s1,
            s2 = %s2,
            improvement = gain,
            threshold = self.config.improvement_threshold,
            "Coarse to fine improvement"
        );

        if gain < self.config.improvement_threshold || cancel.is_cancelled() {
            let cancelled = cancel.is_cancelled();
            return Ok(self.finish(fine_best, phases, Some(gain), false, cancelled, started));
        }

        // UltraFine
        let grid = GridBuilder::refine(
            &self.ranges,
            fine.top_decile(),
            self.config.ultra_fine_points,
            self.config.ultra_fine_range,
        )?;
        drop(fine);
        let (ultra, report) = self.run_phase(Phase::UltraFine, &grid, &ctx)?;
        phases.push(report);
        let best = match ultra.best() {
            Some(best) => best.clone(),
            None => {
                warn!("UltraFine phase ranked nothing, keeping fine best");
                fine_best
            }
        };
        Ok(self.finish(best, phases, Some(gain), true, cancel.is_cancelled(), started))
    }

    /// Evaluate one fixed grid and return its best result.
    ///
    /// # Errors
    ///
    /// Returns error if dispatch breaks or nothing is ranked.
    pub fn run_grid(
        &self,
        grid: &ParameterGrid,
        worker: Arc<dyn Worker>,
        series: &PriceSeries,
        cost: &CostModel,
        cancel: &CancellationToken,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<CoarseToFineOutcome, OptimizerError> {
        let ctx = RunContext {
            worker: &worker,
            series,
            cost,
            cancel,
            progress,
        };
        let started = Instant::now();
        let (ranked, report) = self.run_phase(Phase::Grid, grid, &ctx)?;
        let Some(best) = ranked.best().cloned() else {
            return Err(OptimizerError::NoViableResult { phase: Phase::Grid });
        };
        Ok(self.finish(best, vec![report], None, false, cancel.is_cancelled(), started))
    }

    fn run_phase(
        &self,
        phase: Phase,
        grid: &ParameterGrid,
        ctx: &RunContext<'_>,
    ) -> Result<(RankedResultSet, PhaseReport), OptimizerError> {
        let _span = span!(Level::INFO, "optimizer_phase", phase = phase.as_str()).entered();
        let started = Instant::now();

        let (combos, skipped_invalid) = grid.valid_combinations(self.config.validate_interactions);
        info!(
            grid_size = grid.total_combinations(),
            skipped_invalid,
            to_evaluate = combos.len(),
            "Starting {} phase",
            phase
        );

        let mut report = PhaseReport {
            phase,
            grid_size: grid.total_combinations(),
            skipped_invalid,
            submitted: 0,
            succeeded: 0,
            rejected: 0,
            failed: 0,
            ranked: 0,
            best_score: None,
            elapsed_ms: 0,
            cancelled: false,
        };

        let results = if combos.is_empty() {
            warn!("Every combination failed interaction validation");
            Vec::new()
        } else {
            let prefixed = |completed: u64, total: u64, message: &str| {
                if let Some(observer) = ctx.progress {
                    observer.on_progress(completed, total, &format!("[{phase}] {message}"));
                }
            };
            let outcome = self.dispatcher.dispatch(
                Arc::clone(ctx.worker),
                combos,
                ctx.series,
                ctx.cost,
                ctx.cancel,
                Some(&prefixed),
            )?;
            report.submitted = outcome.submitted;
            report.rejected = outcome.rejected.len();
            report.failed = outcome.failed.len();
            report.cancelled = outcome.cancelled;
            outcome.into_submission_order()
        };
        report.succeeded = results.len();

        let mode = self
            .config
            .phase_filter
            .clone()
            .map_or(FilterMode::Unfiltered, FilterMode::Criteria);
        let ranked = RankedResultSet::new(results, &mode, self.config.metric);
        report.ranked = ranked.len();
        report.best_score = ranked.best().map(|r| self.config.metric.score(r));

        let elapsed = started.elapsed();
        report.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        record_phase(phase.as_str(), elapsed.as_secs_f64(), report.submitted);

        info!(
            ranked = report.ranked,
            rejected = report.rejected,
            failed = report.failed,
            best_score = ?report.best_score,
            "Finished {} phase in {:.2}s",
            phase,
            elapsed.as_secs_f64()
        );

        Ok((ranked, report))
    }

    fn finish(
        &self,
        best: OptimizationResult,
        phases: Vec<PhaseReport>,
        improvement: Option<f64>,
        ran_ultra_fine: bool,
        cancelled: bool,
        started: Instant,
    ) -> CoarseToFineOutcome {
        let total_evaluations = phases.iter().map(|p| p.submitted).sum();
        info!(
            phases = phases.len(),
            total_evaluations,
            ran_ultra_fine,
            cancelled,
            score = %self.config.metric.score(&best),
            "Search finished in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        CoarseToFineOutcome {
            best,
            phases,
            improvement,
            ran_ultra_fine,
            total_evaluations,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;
    use crate::metrics::TradeMetrics;
    use crate::parallel::ParallelConfig;
    use crate::params::{NumericRange, Timeframe};
    use crate::worker::{MockWorker, Rejection};

    fn dispatcher() -> Dispatcher {
        match Dispatcher::with_workers(ParallelConfig::default(), 2) {
            Ok(d) => d,
            Err(e) => panic!("pool should build: {e}"),
        }
    }

    fn series() -> PriceSeries {
        PriceSeries::new("TEST", Timeframe::H1, Vec::new())
    }

    /// Ranges where only `atr_mult` varies.
    fn atr_only() -> ParameterRanges {
        let pin = |v: f64| NumericRange::new(v, v);
        ParameterRanges {
            atr_mult: NumericRange::new(1.0, 3.0),
            trail_start_r: pin(1.0),
            trail_dist_r: pin(0.2),
            entry_validity_hours: pin(24.0),
            leverage: pin(1.0),
            filter_tf: vec![Timeframe::H4],
            direction: vec![crate::params::Direction::Both],
        }
    }

    #[test_case(dec!(1), dec!(1.1), 0.1 ; "positive baseline")]
    #[test_case(dec!(-2), dec!(-1), 0.5 ; "negative baseline uses magnitude")]
    #[test_case(dec!(0), dec!(0), 0.0 ; "zero to zero")]
    #[test_case(dec!(0), dec!(-1), 0.0 ; "zero to negative")]
    fn test_improvement(s1: Decimal, s2: Decimal, expected: f64) {
        assert!((improvement(s1, s2) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_improvement_from_zero_is_infinite() {
        assert!(improvement(dec!(0), dec!(0.5)).is_infinite());
    }

    #[test]
    fn test_coarse_empty_is_no_viable_result() {
        let mut worker = MockWorker::new();
        worker
            .expect_evaluate()
            .returning(|_, _, _| Err(Rejection::NoTrades.into()));

        let dispatcher = dispatcher();
        let optimizer =
            match CoarseToFineOptimizer::new(&dispatcher, atr_only(), CoarseToFineConfig::default()) {
                Ok(o) => o,
                Err(e) => panic!("invalid optimizer: {e}"),
            };
        let result = optimizer.run(
            Arc::new(worker),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        );
        assert_eq!(
            result.err(),
            Some(OptimizerError::NoViableResult {
                phase: Phase::Coarse
            })
        );
    }

    #[test]
    fn test_flat_score_skips_ultra_fine() {
        let mut worker = MockWorker::new();
        worker.expect_evaluate().returning(|params, _, _| {
            let metrics = TradeMetrics {
                total_trades: 40,
                sharpe_ratio: dec!(1.2),
                ..TradeMetrics::default()
            };
            Ok(OptimizationResult::from_metrics(*params, &metrics, None))
        });

        let dispatcher = dispatcher();
        let optimizer =
            match CoarseToFineOptimizer::new(&dispatcher, atr_only(), CoarseToFineConfig::default()) {
                Ok(o) => o,
                Err(e) => panic!("invalid optimizer: {e}"),
            };
        let outcome = match optimizer.run(
            Arc::new(worker),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("run failed: {e}"),
        };

        assert!(!outcome.ran_ultra_fine);
        assert_eq!(outcome.phases.len(), 2);
        assert_eq!(outcome.final_phase(), Phase::Fine);
        assert_eq!(outcome.improvement, Some(0.0));
        assert_eq!(outcome.phases[0].grid_size, 3);
    }

    #[test]
    fn test_rejects_invalid_ranges() {
        let dispatcher = dispatcher();
        let ranges = ParameterRanges {
            direction: Vec::new(),
            ..ParameterRanges::default()
        };
        let result = CoarseToFineOptimizer::new(&dispatcher, ranges, CoarseToFineConfig::default());
        assert!(matches!(result, Err(OptimizerError::Grid(_))));
    }
}
