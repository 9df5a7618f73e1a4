//! Acceptance thresholds and ranking metrics.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::worker::OptimizationResult;

/// Metric used to order results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    /// Win rate in percent.
    WinRate,
    /// Annualized Sharpe ratio.
    #[default]
    SharpeRatio,
    /// Gross gains over gross losses.
    ProfitFactor,
    /// Sum of trade returns.
    TotalReturn,
}

impl RankMetric {
    /// Score of `result` under this metric; higher is better.
    #[must_use]
    pub const fn score(self, result: &OptimizationResult) -> Decimal {
        match self {
            Self::WinRate => result.win_rate,
            Self::SharpeRatio => result.sharpe_ratio,
            Self::ProfitFactor => result.profit_factor,
            Self::TotalReturn => result.total_return(),
        }
    }

    /// Config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WinRate => "win_rate",
            Self::SharpeRatio => "sharpe_ratio",
            Self::ProfitFactor => "profit_factor",
            Self::TotalReturn => "total_return",
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid threshold configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CriteriaError {
    /// A threshold is negative.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Threshold name.
        field: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// A percentage above 100.
    #[error("{field} must be at most 100%, got {value}")]
    AbovePercent {
        /// Threshold name.
        field: &'static str,
        /// Offending value.
        value: Decimal,
    },
}

/// One failed acceptance criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum Violation {
    /// Win rate under the minimum.
    WinRate {
        /// Observed win rate.
        actual: Decimal,
        /// Required minimum.
        required: Decimal,
    },
    /// Drawdown over the maximum.
    MaxDrawdown {
        /// Observed drawdown.
        actual: Decimal,
        /// Allowed maximum.
        allowed: Decimal,
    },
    /// Too few trades.
    MinTrades {
        /// Observed trade count.
        actual: usize,
        /// Required minimum.
        required: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WinRate { actual, required } => {
                write!(f, "win rate {actual:.2}% < {required:.2}%")
            }
            Self::MaxDrawdown { actual, allowed } => {
                write!(f, "max drawdown {actual:.2}% > {allowed:.2}%")
            }
            Self::MinTrades { actual, required } => write!(f, "trades {actual} < {required}"),
        }
    }
}

/// Hard acceptance thresholds; all bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Minimum win rate in percent.
    pub min_win_rate: Decimal,
    /// Maximum drawdown in percent.
    pub max_drawdown: Decimal,
    /// Minimum number of trades.
    pub min_trades: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_win_rate: dec!(70),
            max_drawdown: dec!(20),
            min_trades: 30,
        }
    }
}

impl FilterCriteria {
    /// Check the thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns error for negative thresholds or percentages above 100.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        for (field, value) in [
            ("min_win_rate", self.min_win_rate),
            ("max_drawdown", self.max_drawdown),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(CriteriaError::Negative { field, value });
            }
            if value > dec!(100) {
                return Err(CriteriaError::AbovePercent { field, value });
            }
        }
        Ok(())
    }

    /// Every criterion `result` fails, in a fixed order.
    #[must_use]
    pub fn violations(&self, result: &OptimizationResult) -> Vec<Violation> {
        let mut violations = Vec::new();
        if result.win_rate < self.min_win_rate {
            violations.push(Violation::WinRate {
                actual: result.win_rate,
                required: self.min_win_rate,
            });
        }
        if result.max_drawdown > self.max_drawdown {
            violations.push(Violation::MaxDrawdown {
                actual: result.max_drawdown,
                allowed: self.max_drawdown,
            });
        }
        if result.total_trades < self.min_trades {
            violations.push(Violation::MinTrades {
                actual: result.total_trades,
                required: self.min_trades,
            });
        }
        violations
    }

    /// Whether `result` meets every threshold.
    #[must_use]
    pub fn passes(&self, result: &OptimizationResult) -> bool {
        self.violations(result).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::metrics::TradeMetrics;
    use crate::params::ParameterSet;

    fn result(win_rate: Decimal, max_drawdown: Decimal, trades: usize) -> OptimizationResult {
        let metrics = TradeMetrics {
            total_trades: trades,
            win_rate,
            max_drawdown,
            ..TradeMetrics::default()
        };
        OptimizationResult::from_metrics(ParameterSet::default(), &metrics, None)
    }

    #[test_case(dec!(70), dec!(20), 30, true ; "all thresholds exactly met")]
    #[test_case(dec!(69.99), dec!(20), 30, false ; "win rate one step below")]
    #[test_case(dec!(70), dec!(20.01), 30, false ; "drawdown one step above")]
    #[test_case(dec!(70), dec!(20), 29, false ; "one trade short")]
    fn test_boundaries_are_inclusive(wr: Decimal, mdd: Decimal, trades: usize, expected: bool) {
        let criteria = FilterCriteria::default();
        assert_eq!(criteria.passes(&result(wr, mdd, trades)), expected);
    }

    #[test]
    fn test_all_violations_reported() {
        let criteria = FilterCriteria::default();
        let violations = criteria.violations(&result(dec!(60), dec!(25), 10));
        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].to_string(), "win rate 60.00% < 70.00%");
        assert_eq!(violations[1].to_string(), "max drawdown 25.00% > 20.00%");
        assert_eq!(violations[2].to_string(), "trades 10 < 30");
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let negative = FilterCriteria {
            max_drawdown: dec!(-1),
            ..FilterCriteria::default()
        };
        assert!(matches!(
            negative.validate(),
            Err(CriteriaError::Negative { field: "max_drawdown", .. })
        ));

        let over = FilterCriteria {
            min_win_rate: dec!(101),
            ..FilterCriteria::default()
        };
        assert!(matches!(over.validate(), Err(CriteriaError::AbovePercent { .. })));
        assert!(FilterCriteria::default().validate().is_ok());
    }

    #[test]
    fn test_rank_metric_scores() {
        let mut r = result(dec!(75), dec!(5), 40);
        r.sharpe_ratio = dec!(1.5);
        r.profit_factor = dec!(2.2);
        r.simple_return = dec!(34.5);
        assert_eq!(RankMetric::WinRate.score(&r), dec!(75));
        assert_eq!(RankMetric::SharpeRatio.score(&r), dec!(1.5));
        assert_eq!(RankMetric::ProfitFactor.score(&r), dec!(2.2));
        assert_eq!(RankMetric::TotalReturn.score(&r), dec!(34.5));
    }

    #[test]
    fn test_criteria_yaml_defaults() {
        let criteria: FilterCriteria = match serde_yaml_bw::from_str("min_trades: 50\n") {
            Ok(c) => c,
            Err(e) => panic!("Parse failed: {e}"),
        };
        assert_eq!(criteria.min_trades, 50);
        assert_eq!(criteria.min_win_rate, dec!(70));
    }
}
