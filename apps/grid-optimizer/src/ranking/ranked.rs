//! Deduplicated, filtered, stably ranked results.

use std::collections::HashSet;

use tracing::debug;

use super::{FilterCriteria, RankMetric};
use crate::worker::OptimizationResult;

/// Which results survive ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMode {
    /// Keep only results meeting the criteria.
    Criteria(FilterCriteria),
    /// Keep every result (diagnostics only).
    Unfiltered,
}

/// Leading results making up the top decile of `n`.
#[must_use]
pub const fn top_decile_len(n: usize) -> usize {
    if n == 0 { 0 } else { n.div_ceil(10) }
}

/// Results in descending metric order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResultSet {
    metric: RankMetric,
    results: Vec<OptimizationResult>,
    duplicates_removed: usize,
    filtered_out: usize,
}

impl RankedResultSet {
    /// Dedup, filter and rank `results`.
    ///
    /// Duplicates share a [`crate::params::RoundedKey`]; the first one seen
    /// is kept. Equal scores keep insertion order.
    #[must_use]
    pub fn new(results: Vec<OptimizationResult>, mode: &FilterMode, metric: RankMetric) -> Self {
        let input = results.len();
        let mut seen = HashSet::with_capacity(input);
        let unique: Vec<OptimizationResult> = results
            .into_iter()
            .filter(|r| seen.insert(r.params.rounded_key()))
            .collect();
        let duplicates_removed = input - unique.len();

        let before_filter = unique.len();
        let mut kept: Vec<OptimizationResult> = match mode {
            FilterMode::Criteria(criteria) => {
                unique.into_iter().filter(|r| criteria.passes(r)).collect()
            }
            FilterMode::Unfiltered => unique,
        };
        let filtered_out = before_filter - kept.len();

        // sort_by is stable
        kept.sort_by(|a, b| metric.score(b).cmp(&metric.score(a)));

        debug!(
            input,
            kept = kept.len(),
            duplicates_removed,
            filtered_out,
            metric = %metric,
            "Ranked results"
        );

        Self {
            metric,
            results: kept,
            duplicates_removed,
            filtered_out,
        }
    }

    /// Rank every result without filtering.
    #[must_use]
    pub fn unfiltered(results: Vec<OptimizationResult>, metric: RankMetric) -> Self {
        Self::new(results, &FilterMode::Unfiltered, metric)
    }

    /// Highest ranked result.
    #[must_use]
    pub fn best(&self) -> Option<&OptimizationResult> {
        self.results.first()
    }

    /// Leading `max(1, ceil(n/10))` results.
    #[must_use]
    pub fn top_decile(&self) -> &[OptimizationResult] {
        &self.results[..top_decile_len(self.results.len())]
    }

    /// Metric the set is ordered by.
    #[must_use]
    pub const fn metric(&self) -> RankMetric {
        self.metric
    }

    /// Number of ranked results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Ranked results.
    #[must_use]
    pub fn as_slice(&self) -> &[OptimizationResult] {
        &self.results
    }

    /// Results dropped as duplicates.
    #[must_use]
    pub const fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// Results dropped by the criteria.
    #[must_use]
    pub const fn filtered_out(&self) -> usize {
        self.filtered_out
    }

    /// Take the ranked results.
    #[must_use]
    pub fn into_vec(self) -> Vec<OptimizationResult> {
        self.results
    }
}
