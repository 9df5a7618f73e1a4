//! Result deduplication, acceptance filtering and ranking.

mod criteria;
mod ranked;

pub use criteria::{CriteriaError, FilterCriteria, RankMetric, Violation};
pub use ranked::{FilterMode, RankedResultSet, top_decile_len};
