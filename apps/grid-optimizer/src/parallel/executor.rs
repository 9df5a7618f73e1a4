//! Parallel evaluation executor using a local Rayon pool.
//!
//! Execution units are pool threads, so a running evaluation cannot be
//! killed. A task that misses its deadline is rejected as a timeout but
//! keeps its thread until the worker returns; its slot stays occupied so
//! later tasks never queue behind it on the clock. Deadlines start when a
//! pool thread picks the task up, not when it is queued.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, span, warn};

use super::config::ParallelConfig;
use super::error::DispatchError;
use super::progress::{ProgressObserver, ProgressTracker};
use super::result::{DispatchOutcome, FailedTask, RejectedTask};
use crate::observability::{EvaluationOutcome, record_evaluation};
use crate::params::ParameterSet;
use crate::worker::{
    CostModel, OptimizationResult, PriceSeries, Rejection, Worker, WorkerError, panic_message,
};

/// Shared, immutable inputs of every task in one dispatch.
struct TaskContext {
    worker: Arc<dyn Worker>,
    series: PriceSeries,
    cost: CostModel,
}

/// Message sent back from a pool thread.
enum TaskEvent {
    /// A pool thread began evaluating task `id`.
    Started { id: usize, at: Instant },
    /// Task finished, successfully or not.
    Finished(TaskReport),
}

struct TaskReport {
    id: usize,
    params: ParameterSet,
    outcome: Result<OptimizationResult, WorkerError>,
}

struct InFlight {
    params: ParameterSet,
    /// Set once the task has started and a limit is configured.
    deadline: Option<Instant>,
    /// Already reported as a timeout; waiting only to free the slot.
    timed_out: bool,
}

/// Parallel evaluation dispatcher.
pub struct Dispatcher {
    config: ParallelConfig,
    workers: usize,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher sized for this machine.
    ///
    /// # Errors
    ///
    /// Returns error if the thread pool cannot be built.
    pub fn new(config: ParallelConfig) -> Result<Self, DispatchError> {
        let workers = config.worker_count();
        Self::with_workers(config, workers)
    }

    /// Create a dispatcher with an explicit pool size.
    ///
    /// # Errors
    ///
    /// Returns error if the thread pool cannot be built.
    pub fn with_workers(config: ParallelConfig, workers: usize) -> Result<Self, DispatchError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("grid-worker-{i}"))
            .panic_handler(|_| error!("Evaluation task panicked outside the worker"))
            .build()
            .map_err(|e| DispatchError::ThreadPoolError {
                message: e.to_string(),
            })?;

        Ok(Self {
            config,
            workers,
            pool,
        })
    }

    /// Number of concurrent execution units.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.workers
    }

    /// Evaluate `combos` on the pool.
    ///
    /// Results are collected in completion order. When `cancel` fires, no
    /// new combinations are submitted; in-flight ones are still collected
    /// and returned. A worker panic is recorded as an execution failure of
    /// that combination.
    ///
    /// Returns once every submitted task has reported or timed out; timed
    /// out tasks may still be running on the pool.
    ///
    /// # Errors
    ///
    /// Returns error if `combos` is empty or the result channel breaks.
    pub fn dispatch(
        &self,
        worker: Arc<dyn Worker>,
        combos: Vec<ParameterSet>,
        series: &PriceSeries,
        cost: &CostModel,
        cancel: &CancellationToken,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<DispatchOutcome, DispatchError> {
        if combos.is_empty() {
            return Err(DispatchError::NoJobs);
        }

        let total = combos.len();
        let deadline = self.config.evaluation_deadline(series.len());
        let limit_ms = deadline.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let tracker = ProgressTracker::new(total as u64);
        let start_time = Instant::now();
        let _span = span!(Level::DEBUG, "dispatch", total, workers = self.workers).entered();

        info!(
            "Starting evaluation: {} combinations, {} workers",
            total, self.workers
        );

        let context = Arc::new(TaskContext {
            worker,
            series: series.clone(),
            cost: *cost,
        });
        let (tx, rx) = mpsc::channel::<TaskEvent>();
        let mut tx = Some(tx);
        let mut pending = combos.into_iter().enumerate();
        let mut in_flight: HashMap<usize, InFlight> = HashMap::with_capacity(self.workers);
        let mut outcome = DispatchOutcome {
            total,
            ..DispatchOutcome::default()
        };

        loop {
            while in_flight.len() < self.workers && !cancel.is_cancelled() {
                let Some(sender) = tx.as_ref() else {
                    break;
                };
                let Some((id, params)) = pending.next() else {
                    break;
                };
                in_flight.insert(
                    id,
                    InFlight {
                        params,
                        deadline: None,
                        timed_out: false,
                    },
                );
                outcome.submitted += 1;
                self.spawn_task(id, params, Arc::clone(&context), sender.clone());
            }

            let submission_done = pending.len() == 0 || cancel.is_cancelled();
            if submission_done {
                // Only task senders remain, so a lost task surfaces as a
                // disconnect instead of a hang.
                tx = None;
                if in_flight.values().all(|task| task.timed_out) {
                    break;
                }
            }

            match Self::next_event(&rx, &in_flight) {
                Ok(TaskEvent::Started { id, at }) => {
                    if let Some(task) = in_flight.get_mut(&id) {
                        task.deadline = deadline.map(|d| at + d);
                    }
                    continue;
                }
                Ok(TaskEvent::Finished(report)) => match in_flight.remove(&report.id) {
                    Some(task) if !task.timed_out => Self::record(&mut outcome, &tracker, report),
                    _ => {
                        debug!(task = report.id, "Discarding result that missed its deadline");
                        continue;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    let now = Instant::now();
                    for task in in_flight.values_mut() {
                        let expired = task.deadline.is_some_and(|d| d <= now);
                        if expired && !task.timed_out {
                            task.timed_out = true;
                            warn!(params = %task.params, limit_ms, "Evaluation timed out");
                            let rejection = Rejection::Timeout { limit_ms };
                            outcome.rejected.push(RejectedTask::new(task.params, &rejection));
                            tracker.job_rejected();
                            record_evaluation(EvaluationOutcome::Timeout);
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DispatchError::ChannelClosed {
                        in_flight: in_flight.values().filter(|task| !task.timed_out).count(),
                    });
                }
            }

            let progress = tracker.progress();
            if self.config.track_progress {
                debug!(
                    "Progress: {:.1}% ({}/{}) - ETA: {}s",
                    progress.percentage(),
                    progress.completed,
                    progress.total,
                    progress.eta_secs
                );
            }
            if let Some(observer) = observer {
                observer.on_progress(progress.completed, progress.total, &progress.message());
            }
        }

        outcome.cancelled = outcome.submitted < total;
        outcome.elapsed_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);

        if outcome.cancelled {
            warn!(
                submitted = outcome.submitted,
                total, "Evaluation cancelled before all combinations were submitted"
            );
        }
        let still_running = in_flight.len();
        if still_running > 0 {
            warn!(still_running, "Timed-out evaluations are still occupying pool threads");
        }
        info!(
            success_rate = outcome.success_rate(),
            "Evaluation complete: {}/{} produced results in {:.2}s ({} rejected, {} failed)",
            outcome.results.len(),
            total,
            start_time.elapsed().as_secs_f64(),
            outcome.rejected.len(),
            outcome.failed.len()
        );

        Ok(outcome)
    }

    fn spawn_task(
        &self,
        id: usize,
        params: ParameterSet,
        context: Arc<TaskContext>,
        tx: Sender<TaskEvent>,
    ) {
        self.pool.spawn(move || {
            // Receiver gone means the dispatch already returned.
            let _ = tx.send(TaskEvent::Started {
                id,
                at: Instant::now(),
            });
            let evaluated = panic::catch_unwind(AssertUnwindSafe(|| {
                context
                    .worker
                    .evaluate(&params, &context.series, &context.cost)
            }));
            let outcome = evaluated.unwrap_or_else(|payload| {
                Err(WorkerError::execution(
                    &params,
                    format!("worker panicked: {}", panic_message(payload.as_ref())),
                ))
            });
            let _ = tx.send(TaskEvent::Finished(TaskReport {
                id,
                params,
                outcome,
            }));
        });
    }

    /// Wait for the next event, no longer than the earliest live deadline.
    fn next_event(
        rx: &mpsc::Receiver<TaskEvent>,
        in_flight: &HashMap<usize, InFlight>,
    ) -> Result<TaskEvent, RecvTimeoutError> {
        let earliest = in_flight
            .values()
            .filter(|t| !t.timed_out)
            .filter_map(|t| t.deadline)
            .min();
        match earliest {
            Some(at) => {
                let wait = at.saturating_duration_since(Instant::now());
                rx.recv_timeout(wait.max(Duration::from_millis(1)))
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        }
    }

    fn record(outcome: &mut DispatchOutcome, tracker: &ProgressTracker, report: TaskReport) {
        match report.outcome {
            Ok(result) => {
                outcome.results.push(result);
                outcome.submission_ids.push(report.id);
                tracker.job_succeeded();
                record_evaluation(EvaluationOutcome::Accepted);
            }
            Err(WorkerError::Rejected(rejection)) => {
                debug!(params = %report.params, reason = %rejection, "Combination rejected");
                outcome.rejected.push(RejectedTask::new(report.params, &rejection));
                tracker.job_rejected();
                record_evaluation(EvaluationOutcome::Rejected);
            }
            Err(WorkerError::Execution { params, message }) => {
                warn!(params = %params, error = %message, "Strategy execution failed");
                outcome.failed.push(FailedTask {
                    params: *params,
                    message,
                });
                tracker.job_failed();
                record_evaluation(EvaluationOutcome::Failed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rust_decimal::Decimal;
    use test_case::test_case;

    use super::*;
    use crate::metrics::TradeMetrics;
    use crate::params::{ParamKey, ParamValue, Timeframe};
    use crate::worker::MockWorker;

    fn combos(n: usize) -> Vec<ParameterSet> {
        (0..n)
            .map(|i| {
                let atr = 1.0 + i as f64 / 100.0;
                match ParameterSet::default().with(ParamKey::AtrMult, ParamValue::Float(atr)) {
                    Ok(p) => p,
                    Err(e) => panic!("invalid params: {e}"),
                }
            })
            .collect()
    }

    fn series() -> PriceSeries {
        PriceSeries::new("TEST", Timeframe::H1, Vec::new())
    }

    fn dispatcher(workers: usize, config: ParallelConfig) -> Dispatcher {
        match Dispatcher::with_workers(config, workers) {
            Ok(d) => d,
            Err(e) => panic!("pool should build: {e}"),
        }
    }

    fn ok_result(params: &ParameterSet) -> OptimizationResult {
        let metrics = TradeMetrics {
            total_trades: 10,
            sharpe_ratio: Decimal::from_f64_retain(params.atr_mult()).unwrap_or_default(),
            ..TradeMetrics::default()
        };
        OptimizationResult::from_metrics(*params, &metrics, None)
    }

    #[test]
    fn test_dispatch_collects_every_outcome() {
        let mut worker = MockWorker::new();
        worker.expect_evaluate().returning(|params, _, _| {
            let index = ((params.atr_mult() - 1.0) * 100.0).round() as usize;
            match index % 3 {
                0 => Ok(ok_result(params)),
                1 => Err(Rejection::NoTrades.into()),
                _ => Err(WorkerError::execution(params, "boom")),
            }
        });

        let d = dispatcher(4, ParallelConfig::default());
        let outcome = match d.dispatch(
            Arc::new(worker),
            combos(30),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("dispatch failed: {e}"),
        };

        assert_eq!(outcome.results.len(), 10);
        assert_eq!(outcome.rejected.len(), 10);
        assert_eq!(outcome.failed.len(), 10);
        assert_eq!(outcome.submitted, 30);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_dispatch_rejects_empty_grid() {
        let d = dispatcher(2, ParallelConfig::default());
        let outcome = d.dispatch(
            Arc::new(MockWorker::new()),
            Vec::new(),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        );
        assert_eq!(outcome.err(), Some(DispatchError::NoJobs));
    }

    #[test]
    fn test_progress_reported_per_result() {
        let mut worker = MockWorker::new();
        worker
            .expect_evaluate()
            .returning(|params, _, _| Ok(ok_result(params)));

        let seen = Mutex::new(Vec::new());
        let observer = |completed: u64, total: u64, _: &str| {
            if let Ok(mut guard) = seen.lock() {
                guard.push((completed, total));
            }
        };

        let d = dispatcher(3, ParallelConfig::default());
        let result = d.dispatch(
            Arc::new(worker),
            combos(12),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            Some(&observer),
        );
        assert!(result.is_ok());

        let Ok(guard) = seen.lock() else {
            panic!("lock poisoned");
        };
        assert_eq!(guard.len(), 12);
        assert_eq!(guard.last(), Some(&(12, 12)));
        assert!(guard.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_cancellation_stops_submission_and_keeps_results() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut worker = MockWorker::new();
        let trigger = cancel.clone();
        let counter = Arc::clone(&calls);
        worker.expect_evaluate().returning(move |params, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 5 {
                trigger.cancel();
            }
            Ok(ok_result(params))
        });

        // One worker makes submission strictly sequential.
        let d = dispatcher(1, ParallelConfig::default());
        let outcome = match d.dispatch(
            Arc::new(worker),
            combos(50),
            &series(),
            &CostModel::default(),
            &cancel,
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("dispatch failed: {e}"),
        };

        assert!(outcome.cancelled);
        assert_eq!(outcome.submitted, 5);
        assert_eq!(outcome.results.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    fn timeout_config(base_timeout_secs: u64) -> ParallelConfig {
        ParallelConfig {
            base_timeout_secs,
            timeout_per_1k_bars_secs: 0,
            ..ParallelConfig::default()
        }
    }

    #[test]
    fn test_slow_evaluation_times_out_softly() {
        let mut worker = MockWorker::new();
        worker.expect_evaluate().returning(|params, _, _| {
            if params.atr_mult() > 1.0 {
                std::thread::sleep(Duration::from_millis(3000));
            }
            Ok(ok_result(params))
        });

        let d = dispatcher(2, timeout_config(1));
        let started = Instant::now();
        let outcome = match d.dispatch(
            Arc::new(worker),
            combos(2),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("dispatch failed: {e}"),
        };

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].timed_out);
        assert_eq!(outcome.failed.len(), 0);
        // Returns at the deadline without waiting for the straggler.
        assert!(started.elapsed() < Duration::from_millis(2500));
    }

    #[test]
    fn test_queued_tasks_get_their_own_deadline() {
        let mut worker = MockWorker::new();
        worker.expect_evaluate().returning(|params, _, _| {
            if params.atr_mult() == 1.0 {
                std::thread::sleep(Duration::from_millis(1800));
            }
            Ok(ok_result(params))
        });

        // One thread: the other three wait behind the slow first task.
        let d = dispatcher(1, timeout_config(1));
        let outcome = match d.dispatch(
            Arc::new(worker),
            combos(4),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("dispatch failed: {e}"),
        };

        assert_eq!(outcome.rejected.len(), 1);
        assert!(outcome.rejected[0].timed_out);
        assert_eq!(outcome.rejected[0].params.atr_mult(), 1.0);
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.submitted, 4);
    }

    #[test_case(0 ; "without deadline")]
    #[test_case(5 ; "with deadline")]
    fn test_worker_panic_is_execution_failure(base_timeout_secs: u64) {
        // Plain impl: a panic inside a mock expectation would poison it.
        struct PanicsOnFirst;
        impl Worker for PanicsOnFirst {
            fn evaluate(
                &self,
                params: &ParameterSet,
                _series: &PriceSeries,
                _cost: &CostModel,
            ) -> Result<OptimizationResult, WorkerError> {
                if params.atr_mult() == 1.0 {
                    panic!("indicator buffer underflow");
                }
                Ok(ok_result(params))
            }
        }

        let d = dispatcher(2, timeout_config(base_timeout_secs));
        let outcome = match d.dispatch(
            Arc::new(PanicsOnFirst),
            combos(3),
            &series(),
            &CostModel::default(),
            &CancellationToken::new(),
            None,
        ) {
            Ok(o) => o,
            Err(e) => panic!("dispatch failed: {e}"),
        };

        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].params.atr_mult(), 1.0);
        assert!(outcome.failed[0].message.contains("underflow"));
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.results.len(), 2);
    }

    #[test]
    fn test_results_identical_across_pool_sizes() {
        let run = |workers: usize| {
            let mut worker = MockWorker::new();
            worker
                .expect_evaluate()
                .returning(|params, _, _| Ok(ok_result(params)));
            let d = dispatcher(workers, ParallelConfig::default());
            match d.dispatch(
                Arc::new(worker),
                combos(40),
                &series(),
                &CostModel::default(),
                &CancellationToken::new(),
                None,
            ) {
                Ok(o) => o.into_submission_order(),
                Err(e) => panic!("dispatch failed: {e}"),
            }
        };
        assert_eq!(run(1), run(4));
    }
}
