//! Parameter grids and grid construction.
//!
//! A [`ParameterGrid`] maps every [`ParamKey`](crate::params::ParamKey) to a
//! non-empty, ordered candidate list; its combination count is the product
//! of the list lengths. [`GridBuilder`] produces grids for the fixed search
//! modes and for the coarse and refine phases of the adaptive search.
//!
//! # Example
//!
//! ```ignore
//! use grid_optimizer::grid::{GridBuilder, GridConstraints, GridMode};
//! use grid_optimizer::params::Timeframe;
//!
//! let grid = GridBuilder::generate(GridMode::Standard, Timeframe::H1, &GridConstraints::default())?;
//! let estimate = GridBuilder::estimate(&grid);
//! if GridBuilder::requires_confirmation(&grid, 5_000) {
//!     // ask the operator first
//! }
//! ```

mod builder;
mod error;
mod parameter_grid;
mod policy;

pub use builder::{GridBuilder, GridEstimate};
pub use error::GridError;
pub use parameter_grid::{ParameterGrid, ParameterGridBuilder};
pub use policy::{
    GridConstraints, GridMode, SECONDS_PER_EVALUATION, axis_density, filter_candidates,
};
