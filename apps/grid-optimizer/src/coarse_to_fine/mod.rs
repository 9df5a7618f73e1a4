//! Three-phase adaptive grid search.
//!
//! `Coarse -> Fine -> (UltraFine | Done) -> Done`. Each phase is ranked in
//! full before the next phase's grid is derived from its top decile.

mod error;
mod optimizer;
mod phase;

pub use error::OptimizerError;
pub use optimizer::{CoarseToFineConfig, CoarseToFineOptimizer, CoarseToFineOutcome, improvement};
pub use phase::{
    FINE_POINTS, FINE_RANGE, IMPROVEMENT_THRESHOLD, Phase, PhaseReport, ULTRA_FINE_POINTS,
    ULTRA_FINE_RANGE,
};
