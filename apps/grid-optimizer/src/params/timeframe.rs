//! Candle timeframes used for trend, filter and entry intervals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ParamError;

/// A candle interval.
///
/// Variants are declared shortest first, so the derived ordering is the
/// ordering by duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 15 minutes.
    #[serde(rename = "15m")]
    M15,
    /// 30 minutes.
    #[serde(rename = "30m")]
    M30,
    /// 1 hour.
    #[serde(rename = "1h")]
    H1,
    /// 2 hours.
    #[serde(rename = "2h")]
    H2,
    /// 4 hours.
    #[serde(rename = "4h")]
    H4,
    /// 6 hours.
    #[serde(rename = "6h")]
    H6,
    /// 12 hours.
    #[serde(rename = "12h")]
    H12,
    /// 1 day.
    #[serde(rename = "1d")]
    D1,
    /// 1 week.
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    /// Every timeframe, shortest first.
    pub const ALL: [Self; 9] = [
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H4,
        Self::H6,
        Self::H12,
        Self::D1,
        Self::W1,
    ];

    /// Canonical short label (`"4h"`, `"1d"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H6 => "6h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }

    /// Interval length in minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        match self {
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H2 => 120,
            Self::H4 => 240,
            Self::H6 => 360,
            Self::H12 => 720,
            Self::D1 => 1440,
            Self::W1 => 10_080,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15m" | "15min" => Ok(Self::M15),
            "30m" | "30min" => Ok(Self::M30),
            "1h" | "1H" => Ok(Self::H1),
            "2h" | "2H" => Ok(Self::H2),
            "4h" | "4H" => Ok(Self::H4),
            "6h" | "6H" => Ok(Self::H6),
            "12h" | "12H" => Ok(Self::H12),
            "1d" | "1D" => Ok(Self::D1),
            "1w" | "1W" => Ok(Self::W1),
            other => Err(ParamError::UnknownTimeframe(other.to_string())),
        }
    }
}
