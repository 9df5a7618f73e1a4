//! Valid search ranges per parameter.

use serde::{Deserialize, Serialize};

use super::{Direction, ParamError, ParamKey, ParamValue, Timeframe};

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl NumericRange {
    /// Create a range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Arithmetic midpoint.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        f64::midpoint(self.min, self.max)
    }

    /// Clamp `value` into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Whether `value` lies inside the bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Borrowed view of one parameter's range.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamRange {
    /// Numeric bounds.
    Numeric(NumericRange),
    /// Ordered candidate values.
    Categorical(Vec<ParamValue>),
}

/// The full valid search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRanges {
    /// Stop-loss ATR multiple.
    pub atr_mult: NumericRange,
    /// Trailing-stop activation in R.
    pub trail_start_r: NumericRange,
    /// Trailing-stop distance in R.
    pub trail_dist_r: NumericRange,
    /// Entry validity window in hours.
    pub entry_validity_hours: NumericRange,
    /// Leverage bounds (integer-valued).
    pub leverage: NumericRange,
    /// Candidate filter timeframes, in order.
    pub filter_tf: Vec<Timeframe>,
    /// Candidate directions, in order.
    pub direction: Vec<Direction>,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            atr_mult: NumericRange::new(1.0, 3.0),
            trail_start_r: NumericRange::new(0.5, 3.0),
            trail_dist_r: NumericRange::new(0.1, 0.5),
            entry_validity_hours: NumericRange::new(6.0, 96.0),
            leverage: NumericRange::new(1.0, 10.0),
            filter_tf: vec![
                Timeframe::H2,
                Timeframe::H4,
                Timeframe::H6,
                Timeframe::H12,
                Timeframe::D1,
            ],
            direction: Direction::ALL.to_vec(),
        }
    }
}

impl ParameterRanges {
    /// Range of `key`.
    #[must_use]
    pub fn range(&self, key: ParamKey) -> ParamRange {
        match key {
            ParamKey::AtrMult => ParamRange::Numeric(self.atr_mult),
            ParamKey::TrailStartR => ParamRange::Numeric(self.trail_start_r),
            ParamKey::TrailDistR => ParamRange::Numeric(self.trail_dist_r),
            ParamKey::EntryValidityHours => ParamRange::Numeric(self.entry_validity_hours),
            ParamKey::Leverage => ParamRange::Numeric(self.leverage),
            ParamKey::FilterTf => {
                ParamRange::Categorical(self.filter_tf.iter().copied().map(Into::into).collect())
            }
            ParamKey::Direction => {
                ParamRange::Categorical(self.direction.iter().copied().map(Into::into).collect())
            }
        }
    }

    /// Numeric bounds of `key`, `None` for categorical keys.
    #[must_use]
    pub fn numeric(&self, key: ParamKey) -> Option<NumericRange> {
        match self.range(key) {
            ParamRange::Numeric(r) => Some(r),
            ParamRange::Categorical(_) => None,
        }
    }

    /// Reject non-finite or inverted bounds and empty categories.
    pub fn validate(&self) -> Result<(), ParamError> {
        for key in ParamKey::ALL {
            match self.range(key) {
                ParamRange::Numeric(r) => {
                    if !r.min.is_finite() || !r.max.is_finite() {
                        return Err(ParamError::NonFinite { key });
                    }
                    if r.min > r.max {
                        return Err(ParamError::InvertedRange {
                            key,
                            min: r.min,
                            max: r.max,
                        });
                    }
                    if key == ParamKey::Leverage && r.max < 1.0 {
                        return Err(ParamError::InvertedRange {
                            key,
                            min: 1.0,
                            max: r.max,
                        });
                    }
                }
                ParamRange::Categorical(values) => {
                    if values.is_empty() {
                        return Err(ParamError::EmptyCategory { key });
                    }
                }
            }
        }
        Ok(())
    }
}
