//! Pluggable cost estimators for the best-first search kernel.

mod easy_rule;
mod go_away;
mod heuristic;
mod visibility;
mod weighted_rule;

pub use easy_rule::EasyRule;
pub use go_away::GoAway;
pub use heuristic::{Heuristic, HeuristicValue};
pub use visibility::VisibilityGraph;
pub use weighted_rule::WeightedRule;
