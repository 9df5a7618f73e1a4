//! Strategy parameter model.
//!
//! Parameters are enumerated ([`ParamKey`]) rather than stringly typed, and a
//! [`ParameterSet`] carries one concrete, typed value per key.

mod error;
mod ranges;
mod timeframe;
mod types;

pub use error::ParamError;
pub use ranges::{NumericRange, ParamRange, ParameterRanges};
pub use timeframe::Timeframe;
pub use types::{Direction, ParamKey, ParamKind, ParamValue, ParameterSet, RoundedKey, TradeSide};
