//! Fixed search-mode policy: axis tables, density ratios, trend filters.

use serde::{Deserialize, Serialize};

use crate::params::{Direction, ParamKey, Timeframe};

/// Calibrated wall-clock cost of one evaluation, in seconds.
pub const SECONDS_PER_EVALUATION: f64 = 0.05;

/// Fixed-grid search modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Tens of combinations.
    Quick,
    /// Thousands of combinations.
    Standard,
    /// Tens of thousands of combinations.
    Deep,
    /// Deep tables, thinned on low-sensitivity axes.
    Adaptive,
}

impl GridMode {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
            Self::Deep => "deep",
            Self::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for GridMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GridMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            "deep" => Ok(Self::Deep),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("unknown grid mode: {other}")),
        }
    }
}

/// Operator limits applied on top of a mode's tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConstraints {
    /// Drop leverage values above this.
    pub max_leverage: Option<u32>,
    /// Keep only these directions; empty keeps all.
    pub allowed_directions: Vec<Direction>,
}

// ============================================================================
// Axis tables
// ============================================================================

pub(super) struct ModeTable {
    pub filter_tf: &'static [Timeframe],
    pub entry_validity_hours: &'static [f64],
    pub atr_mult: &'static [f64],
    pub trail_start_r: &'static [f64],
    pub trail_dist_r: &'static [f64],
    pub leverage: &'static [i64],
    pub direction: &'static [Direction],
}

const QUICK: ModeTable = ModeTable {
    filter_tf: &[Timeframe::H12, Timeframe::D1],
    entry_validity_hours: &[48.0, 72.0],
    atr_mult: &[1.25, 2.0],
    trail_start_r: &[1.0, 1.5],
    trail_dist_r: &[0.2],
    leverage: &[1, 3],
    direction: &[Direction::Both],
};

const STANDARD: ModeTable = ModeTable {
    filter_tf: &[Timeframe::H4, Timeframe::H6, Timeframe::H12],
    entry_validity_hours: &[6.0, 12.0, 24.0, 48.0, 72.0],
    atr_mult: &[1.25, 1.5, 2.0, 2.5],
    trail_start_r: &[1.0, 1.5, 2.0, 2.5],
    trail_dist_r: &[0.2, 0.3],
    leverage: &[3, 5],
    direction: &[Direction::Both, Direction::Long],
};

const DEEP: ModeTable = ModeTable {
    filter_tf: &[
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
    ],
    entry_validity_hours: &[6.0, 12.0, 24.0, 36.0, 48.0, 72.0, 96.0],
    atr_mult: &[1.0, 1.25, 1.5, 2.0, 2.5, 3.0],
    trail_start_r: &[0.8, 1.0, 1.5, 2.0, 2.5, 3.0],
    trail_dist_r: &[0.15, 0.2, 0.25, 0.3],
    leverage: &[1, 3, 5],
    direction: &[Direction::Both, Direction::Long, Direction::Short],
};

pub(super) const fn table(mode: GridMode) -> &'static ModeTable {
    match mode {
        GridMode::Quick => &QUICK,
        GridMode::Standard => &STANDARD,
        GridMode::Deep | GridMode::Adaptive => &DEEP,
    }
}

/// Fraction of the deep table kept per axis in adaptive mode.
///
/// Stop-loss multiple, filter interval, leverage and direction move results
/// the most and stay at full density.
#[must_use]
pub const fn axis_density(key: ParamKey) -> f64 {
    match key {
        ParamKey::AtrMult | ParamKey::FilterTf | ParamKey::Leverage | ParamKey::Direction => 1.0,
        ParamKey::TrailStartR | ParamKey::TrailDistR => 0.5,
        ParamKey::EntryValidityHours => 0.3,
    }
}

/// Filter timeframes that make sense above a given trend timeframe.
///
/// Unlisted trend timeframes fall back to the 1h entry.
#[must_use]
pub const fn filter_candidates(trend: Timeframe) -> &'static [Timeframe] {
    const FROM_1H: &[Timeframe] = &[
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
    ];
    match trend {
        Timeframe::H4 => &[Timeframe::H6, Timeframe::H12, Timeframe::D1],
        Timeframe::D1 => &[Timeframe::W1],
        Timeframe::W1 => &[Timeframe::D1],
        _ => FROM_1H,
    }
}

/// Keep `ceil(len * ratio)` (at least one) evenly spaced values, both
/// endpoints included when two or more are kept.
pub(super) fn sample_evenly<T: Copy>(values: &[T], ratio: f64) -> Vec<T> {
    let len = values.len();
    if len == 0 || ratio >= 1.0 {
        return values.to_vec();
    }
    let keep = ((len as f64 * ratio).ceil() as usize).clamp(1, len);
    if keep == len {
        return values.to_vec();
    }
    if keep == 1 {
        return vec![values[len / 2]];
    }
    (0..keep)
        .map(|i| values[(i * (len - 1) + (keep - 1) / 2) / (keep - 1)])
        .collect()
}
