//! Decimal constants for metric calculations.

use rust_decimal::Decimal;

pub const ONE: Decimal = Decimal::ONE;
pub const TWO: Decimal = Decimal::TWO;
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 7); // 0.0000001

/// 252 trading days x 4 sessions, the Sharpe annualization base.
pub const ANNUALIZATION_PERIODS: Decimal = Decimal::from_parts(1008, 0, 0, false, 0);

/// Days assumed when trades carry no timestamps.
pub const FALLBACK_PERIOD_DAYS: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Equity ceiling for the compounded curve; keeps runaway leverage finite.
pub const EQUITY_CAP: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Reported metrics are rounded to this many decimals.
pub const REPORT_DP: u32 = 2;
