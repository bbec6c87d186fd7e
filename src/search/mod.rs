//! The best-first search kernel, its arena, and the resource governor.

mod best_first;
mod memory;
mod search_space;
mod statistics;
mod verbosity;

pub use best_first::{BestFirst, Strategy};
pub use memory::{MemoryGovernor, DEFAULT_MEMORY_LIMIT_MB};
pub use search_space::{NodeId, SearchSpace};
pub use statistics::SearchStatistics;
pub use verbosity::Verbosity;
