//! Metrics calculator for a closed-trade sequence.

use rust_decimal::Decimal;

use super::constants::{
    ANNUALIZATION_PERIODS, EQUITY_CAP, FALLBACK_PERIOD_DAYS, HUNDRED, ONE, REPORT_DP, TOLERANCE,
};
use super::math::{mean, sqrt_decimal, std_dev};
use super::types::{Trade, TradeMetrics};

/// Metrics calculator for a closed-trade sequence.
#[derive(Debug, Default, Clone)]
pub struct MetricsCalculator {
    trades: Vec<Trade>,
}

impl MetricsCalculator {
    /// Create an empty calculator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator over an existing trade list, in execution order.
    #[must_use]
    pub const fn from_trades(trades: Vec<Trade>) -> Self {
        Self { trades }
    }

    /// Add a closed trade.
    pub fn add_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Get all trades.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Calculate all metrics.
    #[must_use]
    pub fn calculate(&self) -> TradeMetrics {
        if self.trades.is_empty() {
            return TradeMetrics::default();
        }

        let pnls: Vec<Decimal> = self.trades.iter().map(|t| t.pnl_pct).collect();
        let total = Decimal::from(pnls.len() as u64);
        let winners = self.trades.iter().filter(|t| t.is_winner()).count();

        let (final_equity, max_drawdown) = Self::compound_curve(&pnls);

        TradeMetrics {
            total_trades: pnls.len(),
            win_rate: (Decimal::from(winners as u64) / total * HUNDRED).round_dp(REPORT_DP),
            simple_return: pnls.iter().sum::<Decimal>().round_dp(REPORT_DP),
            compound_return: ((final_equity - ONE) * HUNDRED).round_dp(REPORT_DP),
            max_drawdown: max_drawdown.round_dp(REPORT_DP),
            sharpe_ratio: Self::sharpe(&pnls).round_dp(REPORT_DP),
            profit_factor: Self::profit_factor(&pnls).round_dp(REPORT_DP),
            stability: Self::stability(&pnls),
            avg_trades_per_day: self.avg_trades_per_day().round_dp(REPORT_DP),
        }
    }

    /// Walk the compounded equity curve starting at 1.0.
    ///
    /// Returns the final equity and the maximum drawdown in percent. Equity
    /// clamps at zero and the walk stops there.
    fn compound_curve(pnls: &[Decimal]) -> (Decimal, Decimal) {
        let mut equity = ONE;
        let mut peak = ONE;
        let mut max_drawdown = Decimal::ZERO;

        for pnl in pnls {
            let factor = ONE + *pnl / HUNDRED;
            equity = equity.checked_mul(factor).unwrap_or(EQUITY_CAP).min(EQUITY_CAP);

            if equity <= Decimal::ZERO {
                equity = Decimal::ZERO;
                max_drawdown = HUNDRED;
                break;
            }
            if equity > peak {
                peak = equity;
            }
            let drawdown = (peak - equity) / peak * HUNDRED;
            max_drawdown = max_drawdown.max(drawdown);
        }

        (equity, max_drawdown.min(HUNDRED))
    }

    /// Sharpe = mean / std * sqrt(252 * 4); zero under two trades or flat PnL.
    fn sharpe(pnls: &[Decimal]) -> Decimal {
        let (Some(avg), Some(std)) = (mean(pnls), std_dev(pnls)) else {
            return Decimal::ZERO;
        };
        if std < TOLERANCE {
            return Decimal::ZERO;
        }
        let annualization = sqrt_decimal(ANNUALIZATION_PERIODS).unwrap_or(Decimal::ZERO);
        avg / std * annualization
    }

    fn profit_factor(pnls: &[Decimal]) -> Decimal {
        let gains: Decimal = pnls.iter().filter(|p| **p > Decimal::ZERO).sum();
        let losses: Decimal = pnls
            .iter()
            .filter(|p| **p < Decimal::ZERO)
            .map(|p| p.abs())
            .sum();

        if losses < TOLERANCE {
            gains
        } else {
            gains / losses
        }
    }

    fn stability(pnls: &[Decimal]) -> Option<u8> {
        let n = pnls.len();
        if n < 3 {
            return None;
        }
        let third = n / 3;
        let segments = [&pnls[..third], &pnls[third..third * 2], &pnls[third * 2..]];
        let profitable = segments
            .iter()
            .filter(|seg| seg.iter().sum::<Decimal>() > Decimal::ZERO)
            .count();
        u8::try_from(profitable).ok()
    }

    fn avg_trades_per_day(&self) -> Decimal {
        let n = self.trades.len();
        if n < 2 {
            return Decimal::ZERO;
        }
        let count = Decimal::from(n as u64);

        let first = self.trades.first().and_then(|t| t.entry_time);
        let last = self.trades.last().and_then(|t| t.entry_time);
        match (first, last) {
            (Some(first), Some(last)) => {
                let days = (last - first).num_days().max(1);
                count / Decimal::from(days)
            }
            _ => count / FALLBACK_PERIOD_DAYS,
        }
    }
}
