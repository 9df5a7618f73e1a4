//! Configuration for parallel evaluation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for parallel evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Upper bound on pool size (0 = derive from physical cores).
    pub max_workers: usize,

    /// Threads each evaluation uses internally; the core budget is divided by it.
    pub evaluation_threads: usize,

    /// Memory one worker may use, in MB.
    pub memory_per_worker_mb: u64,

    /// Memory available to the pool, in MB (`None` = unconstrained).
    pub available_memory_mb: Option<u64>,

    /// Fixed part of the per-evaluation deadline (seconds, 0 = no deadline).
    pub base_timeout_secs: u64,

    /// Deadline added per started 1000 bars of price series (seconds).
    pub timeout_per_1k_bars_secs: u64,

    /// Whether to log progress snapshots at debug level.
    pub track_progress: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            evaluation_threads: 1,
            memory_per_worker_mb: 512,
            available_memory_mb: None,
            base_timeout_secs: 60,
            timeout_per_1k_bars_secs: 5,
            track_progress: true,
        }
    }
}

impl ParallelConfig {
    /// Pool size on this machine.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers_for(num_cpus::get_physical())
    }

    /// Pool size given `physical_cores`.
    #[must_use]
    pub fn workers_for(&self, physical_cores: usize) -> usize {
        let by_cores = (physical_cores.max(1) / self.evaluation_threads.max(1)).max(1);
        let wanted = if self.max_workers > 0 {
            self.max_workers.min(by_cores)
        } else {
            by_cores
        };

        let by_memory = self.available_memory_mb.map_or(usize::MAX, |available| {
            usize::try_from(available / self.memory_per_worker_mb.max(1)).unwrap_or(usize::MAX)
        });

        wanted.min(by_memory).max(1)
    }

    /// Deadline for one evaluation over `bars` bars; `None` when disabled.
    #[must_use]
    pub fn evaluation_deadline(&self, bars: usize) -> Option<Duration> {
        if self.base_timeout_secs == 0 {
            return None;
        }
        let thousands = bars.div_ceil(1000) as u64;
        Some(Duration::from_secs(
            self.base_timeout_secs + self.timeout_per_1k_bars_secs * thousands,
        ))
    }
}
