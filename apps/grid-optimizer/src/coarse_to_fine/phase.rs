//! Search phases and per-phase reports.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Points per numeric axis in the Fine phase.
pub const FINE_POINTS: usize = 5;

/// Relative half-width of the Fine window.
pub const FINE_RANGE: f64 = 0.5;

/// Points per numeric axis in the UltraFine phase.
pub const ULTRA_FINE_POINTS: usize = 7;

/// Relative half-width of the UltraFine window.
pub const ULTRA_FINE_RANGE: f64 = 0.2;

/// Minimum Coarse to Fine improvement that triggers UltraFine.
pub const IMPROVEMENT_THRESHOLD: f64 = 0.05;

/// Search phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Extremes and midpoints of every axis.
    Coarse,
    /// Window around the coarse optimum.
    Fine,
    /// Narrower, denser window around the fine optimum.
    UltraFine,
    /// Single fixed-mode grid, no refinement.
    Grid,
    /// Finished.
    Done,
}

impl Phase {
    /// Metric and log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coarse => "coarse",
            Self::Fine => "fine",
            Self::UltraFine => "ultra_fine",
            Self::Grid => "grid",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one phase did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase.
    pub phase: Phase,
    /// Combinations in the phase grid.
    pub grid_size: usize,
    /// Combinations skipped by interaction validation.
    pub skipped_invalid: usize,
    /// Combinations handed to workers.
    pub submitted: usize,
    /// Evaluations that produced a result.
    pub succeeded: usize,
    /// Soft rejections, timeouts included.
    pub rejected: usize,
    /// Strategy failures.
    pub failed: usize,
    /// Results left after dedup and filtering.
    pub ranked: usize,
    /// Score of the phase's best result.
    pub best_score: Option<Decimal>,
    /// Wall time in milliseconds.
    pub elapsed_ms: u64,
    /// Whether cancellation cut the phase short.
    pub cancelled: bool,
}
