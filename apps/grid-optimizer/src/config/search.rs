//! Search configuration.

use serde::{Deserialize, Serialize};

use crate::batch::SearchMode;
use crate::coarse_to_fine::{CoarseToFineConfig, IMPROVEMENT_THRESHOLD};
use crate::grid::GridConstraints;
use crate::params::{ParameterRanges, Timeframe};
use crate::ranking::RankMetric;

/// How parameter spaces are searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Coarse-to-fine or a fixed grid mode.
    pub mode: SearchMode,
    /// Trend timeframe used when estimating fixed grids.
    pub trend_timeframe: Timeframe,
    /// Score used for ranking.
    pub rank_metric: RankMetric,
    /// Grids above this many combinations need confirmation.
    pub confirmation_threshold: usize,
    /// Coarse-to-fine input ranges.
    pub ranges: ParameterRanges,
    /// Limits on fixed grids.
    pub constraints: GridConstraints,
    /// Skip combinations failing the interaction rules.
    pub validate_interactions: bool,
    /// Coarse to Fine improvement that triggers UltraFine.
    pub improvement_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            trend_timeframe: Timeframe::H1,
            rank_metric: RankMetric::default(),
            confirmation_threshold: 10_000,
            ranges: ParameterRanges::default(),
            constraints: GridConstraints::default(),
            validate_interactions: false,
            improvement_threshold: IMPROVEMENT_THRESHOLD,
        }
    }
}

impl SearchConfig {
    /// Coarse-to-fine tuning derived from this section.
    #[must_use]
    pub fn tuning(&self) -> CoarseToFineConfig {
        CoarseToFineConfig {
            metric: self.rank_metric,
            improvement_threshold: self.improvement_threshold,
            validate_interactions: self.validate_interactions,
            ..CoarseToFineConfig::default()
        }
    }
}
