//! Parameter keys, values and the immutable `ParameterSet`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ParamError, Timeframe};

// ============================================================================
// Direction
// ============================================================================

/// Which trade directions a strategy configuration is allowed to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Long and short trades.
    Both,
    /// Long trades only.
    Long,
    /// Short trades only.
    Short,
}

impl Direction {
    /// Every direction in canonical order.
    pub const ALL: [Self; 3] = [Self::Both, Self::Long, Self::Short];

    /// Label used in presets and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Both => "Both",
            Self::Long => "Long",
            Self::Short => "Short",
        }
    }

    /// Whether a trade on `side` is kept under this direction setting.
    #[must_use]
    pub const fn admits(self, side: TradeSide) -> bool {
        matches!(
            (self, side),
            (Self::Both, _) | (Self::Long, TradeSide::Long) | (Self::Short, TradeSide::Short)
        )
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            _ => Err(ParamError::UnknownDirection(s.to_string())),
        }
    }
}

/// Side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    /// Long position.
    Long,
    /// Short position.
    Short,
}

// ============================================================================
// Keys and values
// ============================================================================

/// Kind of values a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Continuous numeric value.
    Float,
    /// Integer-valued numeric; rounded after sampling.
    Integer,
    /// Enumerated value list.
    Categorical,
}

/// Every tunable strategy parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    /// Stop-loss distance as a multiple of ATR.
    AtrMult,
    /// Profit (in R) at which the trailing stop activates.
    TrailStartR,
    /// Trailing stop distance in R.
    TrailDistR,
    /// How long an entry signal stays valid, in hours.
    EntryValidityHours,
    /// Position leverage.
    Leverage,
    /// Multi-timeframe filter interval.
    FilterTf,
    /// Allowed trade direction.
    Direction,
}

impl ParamKey {
    /// All keys in grid order.
    pub const ALL: [Self; 7] = [
        Self::AtrMult,
        Self::TrailStartR,
        Self::TrailDistR,
        Self::EntryValidityHours,
        Self::Leverage,
        Self::FilterTf,
        Self::Direction,
    ];

    /// Snake-case name used in presets and config.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AtrMult => "atr_mult",
            Self::TrailStartR => "trail_start_r",
            Self::TrailDistR => "trail_dist_r",
            Self::EntryValidityHours => "entry_validity_hours",
            Self::Leverage => "leverage",
            Self::FilterTf => "filter_tf",
            Self::Direction => "direction",
        }
    }

    /// Value kind accepted by this key.
    #[must_use]
    pub const fn kind(self) -> ParamKind {
        match self {
            Self::AtrMult | Self::TrailStartR | Self::TrailDistR | Self::EntryValidityHours => {
                ParamKind::Float
            }
            Self::Leverage => ParamKind::Integer,
            Self::FilterTf | Self::Direction => ParamKind::Categorical,
        }
    }

    /// Whether the key is sampled numerically.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self.kind(), ParamKind::Categorical)
    }

    /// Position in [`ParamKey::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate value on a grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Timeframe value.
    Timeframe(Timeframe),
    /// Direction value.
    Direction(Direction),
}

impl ParamValue {
    /// Numeric view of the value, if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Timeframe(_) | Self::Direction(_) => None,
        }
    }

    /// Whether this value is acceptable for `key`.
    #[must_use]
    pub fn matches_kind(&self, key: ParamKey) -> bool {
        match (key, self) {
            (ParamKey::Leverage, Self::Int(v)) => *v >= 1,
            (ParamKey::FilterTf, Self::Timeframe(_))
            | (ParamKey::Direction, Self::Direction(_)) => true,
            (k, Self::Float(_)) => k.kind() == ParamKind::Float,
            _ => false,
        }
    }

    fn expected_for(key: ParamKey) -> &'static str {
        match key {
            ParamKey::Leverage => "positive integer",
            ParamKey::FilterTf => "timeframe",
            ParamKey::Direction => "direction",
            _ => "float",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Timeframe(tf) => write!(f, "{tf}"),
            Self::Direction(d) => write!(f, "{d}"),
        }
    }
}

impl From<Timeframe> for ParamValue {
    fn from(tf: Timeframe) -> Self {
        Self::Timeframe(tf)
    }
}

impl From<Direction> for ParamValue {
    fn from(d: Direction) -> Self {
        Self::Direction(d)
    }
}

// ============================================================================
// ParameterSet
// ============================================================================

/// Dedup identity of a parameter set: numerics rounded to two decimals,
/// categoricals by variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundedKey([i64; 7]);

/// One concrete assignment of every parameter.
///
/// Values are fixed at construction; [`ParameterSet::with`] returns a new set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    atr_mult: f64,
    trail_start_r: f64,
    trail_dist_r: f64,
    entry_validity_hours: f64,
    leverage: u32,
    filter_tf: Timeframe,
    direction: Direction,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            atr_mult: 1.5,
            trail_start_r: 1.0,
            trail_dist_r: 0.2,
            entry_validity_hours: 24.0,
            leverage: 1,
            filter_tf: Timeframe::H4,
            direction: Direction::Both,
        }
    }
}

impl ParameterSet {
    /// Build a set from one value per key, in any order.
    ///
    /// Keys not present keep their default value.
    pub fn from_values<I>(values: I) -> Result<Self, ParamError>
    where
        I: IntoIterator<Item = (ParamKey, ParamValue)>,
    {
        values
            .into_iter()
            .try_fold(Self::default(), |set, (key, value)| set.with(key, value))
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(self, key: ParamKey, value: ParamValue) -> Result<Self, ParamError> {
        let mismatch = || ParamError::TypeMismatch {
            key,
            expected: ParamValue::expected_for(key),
            actual: value.to_string(),
        };
        let finite = |v: f64| {
            if v.is_finite() {
                Ok(v)
            } else {
                Err(ParamError::NonFinite { key })
            }
        };

        let mut next = self;
        match (key, value) {
            (ParamKey::AtrMult, ParamValue::Float(v)) => next.atr_mult = finite(v)?,
            (ParamKey::TrailStartR, ParamValue::Float(v)) => next.trail_start_r = finite(v)?,
            (ParamKey::TrailDistR, ParamValue::Float(v)) => next.trail_dist_r = finite(v)?,
            (ParamKey::EntryValidityHours, ParamValue::Float(v)) => {
                next.entry_validity_hours = finite(v)?;
            }
            (ParamKey::Leverage, ParamValue::Int(v)) => {
                next.leverage = u32::try_from(v)
                    .ok()
                    .filter(|lev| *lev >= 1)
                    .ok_or_else(mismatch)?;
            }
            (ParamKey::FilterTf, ParamValue::Timeframe(tf)) => next.filter_tf = tf,
            (ParamKey::Direction, ParamValue::Direction(d)) => next.direction = d,
            _ => return Err(mismatch()),
        }
        Ok(next)
    }

    /// Value of `key`.
    #[must_use]
    pub fn get(&self, key: ParamKey) -> ParamValue {
        match key {
            ParamKey::AtrMult => ParamValue::Float(self.atr_mult),
            ParamKey::TrailStartR => ParamValue::Float(self.trail_start_r),
            ParamKey::TrailDistR => ParamValue::Float(self.trail_dist_r),
            ParamKey::EntryValidityHours => ParamValue::Float(self.entry_validity_hours),
            ParamKey::Leverage => ParamValue::Int(i64::from(self.leverage)),
            ParamKey::FilterTf => ParamValue::Timeframe(self.filter_tf),
            ParamKey::Direction => ParamValue::Direction(self.direction),
        }
    }

    /// Stop-loss ATR multiple.
    #[must_use]
    pub const fn atr_mult(&self) -> f64 {
        self.atr_mult
    }

    /// Trailing-stop activation in R.
    #[must_use]
    pub const fn trail_start_r(&self) -> f64 {
        self.trail_start_r
    }

    /// Trailing-stop distance in R.
    #[must_use]
    pub const fn trail_dist_r(&self) -> f64 {
        self.trail_dist_r
    }

    /// Entry signal validity window in hours.
    #[must_use]
    pub const fn entry_validity_hours(&self) -> f64 {
        self.entry_validity_hours
    }

    /// Leverage multiplier.
    #[must_use]
    pub const fn leverage(&self) -> u32 {
        self.leverage
    }

    /// Filter timeframe.
    #[must_use]
    pub const fn filter_tf(&self) -> Timeframe {
        self.filter_tf
    }

    /// Allowed trade direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Dedup identity, rounding numerics to two decimals.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rounded_key(&self) -> RoundedKey {
        let round2 = |v: f64| (v * 100.0).round() as i64;
        RoundedKey([
            round2(self.atr_mult),
            round2(self.trail_start_r),
            round2(self.trail_dist_r),
            round2(self.entry_validity_hours),
            i64::from(self.leverage) * 100,
            self.filter_tf as i64,
            self.direction as i64,
        ])
    }

    /// Checks the cross-parameter consistency rules:
    ///
    /// - `atr_mult * trail_start_r` within `[0.5, 2.5]`
    /// - a 12h filter keeps entries valid for at most 24h, a 1d filter at most 48h
    /// - `trail_start_r / trail_dist_r` within `[3, 20]` when the distance is positive
    #[must_use]
    pub fn has_valid_interactions(&self) -> bool {
        let risk_span = self.atr_mult * self.trail_start_r;
        if !(0.5..=2.5).contains(&risk_span) {
            return false;
        }

        let validity_cap = match self.filter_tf {
            Timeframe::H12 => Some(24.0),
            Timeframe::D1 => Some(48.0),
            _ => None,
        };
        if validity_cap.is_some_and(|cap| self.entry_validity_hours > cap) {
            return false;
        }

        if self.trail_dist_r > 0.0 {
            let ratio = self.trail_start_r / self.trail_dist_r;
            if !(3.0..=20.0).contains(&ratio) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "atr={} ts={} td={} ev={} lev={} tf={} dir={}",
            self.atr_mult,
            self.trail_start_r,
            self.trail_dist_r,
            self.entry_validity_hours,
            self.leverage,
            self.filter_tf,
            self.direction
        )
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn set(values: Vec<(ParamKey, ParamValue)>) -> ParameterSet {
        match ParameterSet::from_values(values) {
            Ok(s) => s,
            Err(e) => panic!("Invalid parameter set: {e}"),
        }
    }

    #[test]
    fn test_with_rejects_kind_mismatch() {
        let result = ParameterSet::default().with(ParamKey::AtrMult, ParamValue::Int(2));
        assert!(matches!(result, Err(ParamError::TypeMismatch { .. })));

        let result =
            ParameterSet::default().with(ParamKey::FilterTf, ParamValue::Direction(Direction::Long));
        assert!(matches!(result, Err(ParamError::TypeMismatch { .. })));
    }

    #[test]
    fn test_with_rejects_non_finite_and_non_positive_leverage() {
        let result = ParameterSet::default().with(ParamKey::TrailDistR, ParamValue::Float(f64::NAN));
        assert!(matches!(result, Err(ParamError::NonFinite { .. })));

        let result = ParameterSet::default().with(ParamKey::Leverage, ParamValue::Int(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_returns_new_set() {
        let base = ParameterSet::default();
        let changed = set(vec![(ParamKey::Leverage, ParamValue::Int(5))]);
        assert_eq!(base.leverage(), 1);
        assert_eq!(changed.leverage(), 5);
        assert_eq!(changed.get(ParamKey::Leverage), ParamValue::Int(5));
    }

    #[test]
    fn test_rounded_key_ignores_third_decimal() {
        let a = set(vec![
            (ParamKey::AtrMult, ParamValue::Float(1.501)),
            (ParamKey::TrailStartR, ParamValue::Float(1.004)),
        ]);
        let b = set(vec![
            (ParamKey::AtrMult, ParamValue::Float(1.499)),
            (ParamKey::TrailStartR, ParamValue::Float(0.996)),
        ]);
        assert_eq!(a.rounded_key(), b.rounded_key());

        let c = set(vec![(ParamKey::AtrMult, ParamValue::Float(1.52))]);
        assert_ne!(a.rounded_key(), c.rounded_key());
    }

    #[test]
    fn test_direction_admits() {
        assert!(Direction::Both.admits(TradeSide::Short));
        assert!(Direction::Long.admits(TradeSide::Long));
        assert!(!Direction::Long.admits(TradeSide::Short));
        assert!(!Direction::Short.admits(TradeSide::Long));
    }

    #[test_case(1.0, 1.0, 0.2, Timeframe::H4, 72.0, true ; "balanced")]
    #[test_case(2.0, 2.0, 0.2, Timeframe::H4, 24.0, false ; "risk span too wide")]
    #[test_case(1.0, 1.0, 0.2, Timeframe::H12, 48.0, false ; "12h filter long validity")]
    #[test_case(1.0, 1.0, 0.2, Timeframe::D1, 48.0, true ; "1d filter at cap")]
    #[test_case(1.0, 2.0, 0.05, Timeframe::H4, 24.0, false ; "trail ratio above 20")]
    #[test_case(1.0, 0.5, 0.3, Timeframe::H4, 24.0, false ; "trail ratio below 3")]
    fn test_interaction_rules(
        atr: f64,
        start: f64,
        dist: f64,
        filter_tf: Timeframe,
        validity: f64,
        expected: bool,
    ) {
        let params = set(vec![
            (ParamKey::AtrMult, ParamValue::Float(atr)),
            (ParamKey::TrailStartR, ParamValue::Float(start)),
            (ParamKey::TrailDistR, ParamValue::Float(dist)),
            (ParamKey::FilterTf, ParamValue::Timeframe(filter_tf)),
            (ParamKey::EntryValidityHours, ParamValue::Float(validity)),
        ]);
        assert_eq!(params.has_valid_interactions(), expected);
    }

    #[test]
    fn test_parameter_set_serializes_with_key_names() {
        let json = match serde_json::to_value(ParameterSet::default()) {
            Ok(v) => v,
            Err(e) => panic!("Serialization failed: {e}"),
        };
        for key in ParamKey::ALL {
            assert!(json.get(key.name()).is_some(), "missing {key}");
        }
        assert_eq!(json["filter_tf"], "4h");
        assert_eq!(json["direction"], "Both");
    }
}
