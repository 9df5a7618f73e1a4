//! Core types for trade metrics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::params::TradeSide;

/// One closed trade as produced by a strategy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Position side.
    pub side: TradeSide,
    /// Net PnL in percent of position value, before leverage.
    pub pnl_pct: Decimal,
    /// Entry time, when known.
    pub entry_time: Option<DateTime<Utc>>,
    /// Exit time, when known.
    pub exit_time: Option<DateTime<Utc>>,
}

impl Trade {
    /// Trade without timestamps.
    #[must_use]
    pub const fn new(side: TradeSide, pnl_pct: Decimal) -> Self {
        Self {
            side,
            pnl_pct,
            entry_time: None,
            exit_time: None,
        }
    }

    /// Attach an entry time.
    #[must_use]
    pub const fn with_entry_time(mut self, at: DateTime<Utc>) -> Self {
        self.entry_time = Some(at);
        self
    }

    /// Same trade with PnL multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: Decimal) -> Self {
        Self {
            pnl_pct: self.pnl_pct * factor,
            ..self.clone()
        }
    }

    /// Check if this trade was profitable.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > Decimal::ZERO
    }
}

/// Metrics over a trade sequence, rounded to two decimals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMetrics {
    /// Number of trades.
    pub total_trades: usize,
    /// Winning trades as a percentage (0-100).
    pub win_rate: Decimal,
    /// Sum of per-trade PnL percentages.
    pub simple_return: Decimal,
    /// Compounded return in percent, floored at -100.
    pub compound_return: Decimal,
    /// Maximum drawdown of the compounded curve, percent (0-100).
    pub max_drawdown: Decimal,
    /// Annualized Sharpe ratio.
    pub sharpe_ratio: Decimal,
    /// Gross gains over gross losses.
    pub profit_factor: Decimal,
    /// Profitable thirds of the sequence (0-3); `None` under three trades.
    pub stability: Option<u8>,
    /// Average number of trades per day.
    pub avg_trades_per_day: Decimal,
}

/// Quality grade of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// WR >= 80, PF >= 3, MDD <= 10.
    S,
    /// WR >= 70, PF >= 2, MDD <= 15.
    A,
    /// WR >= 60, PF >= 1.5, MDD <= 20.
    B,
    /// Anything else.
    C,
}

impl Grade {
    /// Grade from win rate, profit factor and max drawdown (percent units).
    #[must_use]
    pub fn classify(win_rate: Decimal, profit_factor: Decimal, max_drawdown: Decimal) -> Self {
        let tiers = [
            (Self::S, dec!(80), dec!(3), dec!(10)),
            (Self::A, dec!(70), dec!(2), dec!(15)),
            (Self::B, dec!(60), dec!(1.5), dec!(20)),
        ];
        tiers
            .into_iter()
            .find(|(_, wr, pf, mdd)| {
                win_rate >= *wr && profit_factor >= *pf && max_drawdown <= *mdd
            })
            .map_or(Self::C, |(grade, ..)| grade)
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(label)
    }
}
