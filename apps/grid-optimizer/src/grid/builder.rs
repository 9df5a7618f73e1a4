//! Grid generation, estimation, coarse sampling and refinement.

use tracing::debug;

use super::policy::{self, GridConstraints, GridMode, SECONDS_PER_EVALUATION};
use super::{GridError, ParameterGrid};
use crate::params::{
    NumericRange, ParamKey, ParamKind, ParamRange, ParamValue, ParameterRanges, Timeframe,
};
use crate::worker::OptimizationResult;

/// Size and runtime estimate of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEstimate {
    /// Number of combinations.
    pub combinations: usize,
    /// Estimated runtime in minutes, one decimal.
    pub estimated_minutes: f64,
}

/// Builds parameter grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder;

impl GridBuilder {
    /// Grid for a fixed search mode, specialised to a trend timeframe.
    ///
    /// The mode's filter timeframes are intersected with the ones that make
    /// sense above `trend_tf`; if nothing survives, the first sensible one is
    /// used. Constraints then trim leverage and direction.
    pub fn generate(
        mode: GridMode,
        trend_tf: Timeframe,
        constraints: &GridConstraints,
    ) -> Result<ParameterGrid, GridError> {
        let table = policy::table(mode);
        let thin = |key: ParamKey, values: &[f64]| -> Vec<f64> {
            if mode == GridMode::Adaptive {
                policy::sample_evenly(values, policy::axis_density(key))
            } else {
                values.to_vec()
            }
        };

        let sensible = policy::filter_candidates(trend_tf);
        let mut filter_tf: Vec<_> = table
            .filter_tf
            .iter()
            .copied()
            .filter(|tf| sensible.contains(tf))
            .collect();
        if filter_tf.is_empty() {
            filter_tf.extend(sensible.first().copied());
        }

        let leverage: Vec<i64> = table
            .leverage
            .iter()
            .copied()
            .filter(|lev| {
                constraints
                    .max_leverage
                    .is_none_or(|max| *lev <= i64::from(max))
            })
            .collect();

        let direction: Vec<_> = table
            .direction
            .iter()
            .copied()
            .filter(|d| {
                constraints.allowed_directions.is_empty()
                    || constraints.allowed_directions.contains(d)
            })
            .collect();

        let grid = ParameterGrid::builder()
            .add_float_param(ParamKey::AtrMult, thin(ParamKey::AtrMult, table.atr_mult))
            .add_float_param(
                ParamKey::TrailStartR,
                thin(ParamKey::TrailStartR, table.trail_start_r),
            )
            .add_float_param(
                ParamKey::TrailDistR,
                thin(ParamKey::TrailDistR, table.trail_dist_r),
            )
            .add_float_param(
                ParamKey::EntryValidityHours,
                thin(ParamKey::EntryValidityHours, table.entry_validity_hours),
            )
            .add_int_param(ParamKey::Leverage, leverage)
            .add_timeframes(filter_tf)
            .add_directions(direction)
            .build()?;

        debug!(
            mode = %mode,
            trend_tf = %trend_tf,
            combinations = grid.total_combinations(),
            "Generated grid"
        );
        Ok(grid)
    }

    /// Combination count and estimated runtime.
    #[must_use]
    pub fn estimate(grid: &ParameterGrid) -> GridEstimate {
        let combinations = grid.total_combinations();
        let minutes = combinations as f64 * SECONDS_PER_EVALUATION / 60.0;
        GridEstimate {
            combinations,
            estimated_minutes: (minutes * 10.0).round() / 10.0,
        }
    }

    /// Whether running `grid` needs operator confirmation.
    #[must_use]
    pub fn requires_confirmation(grid: &ParameterGrid, threshold: usize) -> bool {
        grid.total_combinations() > threshold
    }

    /// Coarse grid touching every axis's extremes.
    ///
    /// Numeric axes get exactly `{min, midpoint, max}`; categorical axes get
    /// `{first, middle, last}` of their list, capped at three.
    pub fn coarse(ranges: &ParameterRanges) -> Result<ParameterGrid, GridError> {
        ranges.validate()?;

        let mut builder = ParameterGrid::builder();
        for key in ParamKey::ALL {
            let values = match ranges.range(key) {
                ParamRange::Numeric(r) => {
                    let mid = r.clamp(round3(r.midpoint()));
                    numeric_values(key, &r, &[r.min, mid, r.max])
                }
                ParamRange::Categorical(values) => spread_three(&values),
            };
            builder = builder.axis(key, values);
        }
        builder.build()
    }

    /// Grid centered on the best of `top`, which must be in rank order.
    ///
    /// Numeric axes span `best * (1 +/- range_factor)` clipped to `ranges`,
    /// sampled at `point_count` evenly spaced values. Categorical axes keep
    /// the `point_count` most frequent values in `top`, ties broken by first
    /// occurrence.
    pub fn refine(
        ranges: &ParameterRanges,
        top: &[OptimizationResult],
        point_count: usize,
        range_factor: f64,
    ) -> Result<ParameterGrid, GridError> {
        let Some(best) = top.first() else {
            return Err(GridError::NoResults);
        };
        if point_count == 0 {
            return Err(GridError::InvalidRefinement {
                message: "point_count must be at least 1".to_string(),
            });
        }
        if !range_factor.is_finite() || !(0.0..1.0).contains(&range_factor) {
            return Err(GridError::InvalidRefinement {
                message: format!("range_factor {range_factor} outside [0, 1)"),
            });
        }
        ranges.validate()?;

        let mut builder = ParameterGrid::builder();
        for key in ParamKey::ALL {
            let values = match ranges.range(key) {
                ParamRange::Numeric(r) => {
                    let center = best.params.get(key).as_f64().unwrap_or_else(|| r.midpoint());
                    let samples = window(&r, center, point_count, range_factor);
                    numeric_values(key, &r, &samples)
                }
                ParamRange::Categorical(allowed) => {
                    most_frequent(key, top, &allowed, point_count)
                }
            };
            builder = builder.axis(key, values);
        }
        builder.build()
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Typed axis values for a numeric key, rounded and clamped.
#[allow(clippy::cast_possible_truncation)]
fn numeric_values(key: ParamKey, range: &NumericRange, samples: &[f64]) -> Vec<ParamValue> {
    if key.kind() == ParamKind::Integer {
        let lo = range.min.ceil().max(1.0) as i64;
        let hi = (range.max.floor() as i64).max(lo);
        samples
            .iter()
            .map(|v| ParamValue::Int((v.round() as i64).clamp(lo, hi)))
            .collect()
    } else {
        samples.iter().map(|v| ParamValue::Float(*v)).collect()
    }
}

fn spread_three(values: &[ParamValue]) -> Vec<ParamValue> {
    match values.len() {
        0..=3 => values.to_vec(),
        n => vec![values[0], values[n / 2], values[n - 1]],
    }
}

/// Evenly spaced samples of `[center*(1-f), center*(1+f)]` clipped to `range`.
fn window(range: &NumericRange, center: f64, points: usize, factor: f64) -> Vec<f64> {
    let center = range.clamp(center);
    let a = center * (1.0 - factor);
    let b = center * (1.0 + factor);
    let lo = range.clamp(a.min(b));
    let hi = range.clamp(a.max(b));

    if points == 1 || lo >= hi {
        return vec![range.clamp(round3(center))];
    }
    let step = (hi - lo) / (points - 1) as f64;
    (0..points)
        .map(|i| {
            let v = if i == points - 1 { hi } else { lo + step * i as f64 };
            range.clamp(round3(v))
        })
        .collect()
}

fn most_frequent(
    key: ParamKey,
    top: &[OptimizationResult],
    allowed: &[ParamValue],
    points: usize,
) -> Vec<ParamValue> {
    // (value, count) in first-seen order
    let mut seen: Vec<(ParamValue, usize)> = Vec::new();
    for result in top {
        let value = result.params.get(key);
        if !allowed.contains(&value) {
            continue;
        }
        match seen.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 += 1,
            None => seen.push((value, 1)),
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    seen.sort_by(|a, b| b.1.cmp(&a.1));
    seen.into_iter().take(points).map(|(v, _)| v).collect()
}
