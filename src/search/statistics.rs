use crate::heuristics::HeuristicValue;
use ordered_float::OrderedFloat;
use tracing::{debug, info};

/// A progress diagnostic is emitted every this many expansions.
const PROGRESS_INTERVAL: u64 = 1000;

#[derive(Debug)]
pub struct SearchStatistics {
    /// Number of nodes expanded
    expanded_nodes: u64,
    /// Number of unique nodes generated
    generated_nodes: u64,
    /// Number of nodes scored by the heuristic
    evaluated_nodes: u64,
    /// Best heuristic value found so far
    best_heuristic_value: HeuristicValue,
}

impl Default for SearchStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchStatistics {
    pub fn new() -> Self {
        Self {
            expanded_nodes: 0,
            generated_nodes: 0,
            evaluated_nodes: 0,
            best_heuristic_value: OrderedFloat(f64::INFINITY),
        }
    }

    pub fn increment_expanded_nodes(&mut self) {
        self.expanded_nodes += 1;
        if self.expanded_nodes % PROGRESS_INTERVAL == 0 {
            self.log();
        }
    }

    pub fn increment_generated_nodes(&mut self, num_nodes: usize) {
        self.generated_nodes += num_nodes as u64;
    }

    pub fn increment_evaluated_nodes(&mut self) {
        self.evaluated_nodes += 1;
    }

    pub fn register_heuristic_value(&mut self, heuristic_value: HeuristicValue) {
        if heuristic_value < self.best_heuristic_value {
            self.best_heuristic_value = heuristic_value;
            debug!(best_heuristic_value = self.best_heuristic_value.into_inner());
        }
    }

    pub fn expanded_nodes(&self) -> u64 {
        self.expanded_nodes
    }

    fn log(&self) {
        debug!(
            expanded_nodes = self.expanded_nodes,
            generated_nodes = self.generated_nodes,
            evaluated_nodes = self.evaluated_nodes,
            best_heuristic_value = self.best_heuristic_value.into_inner(),
        );
    }

    pub fn finalise(&self) {
        info!(
            expanded_nodes = self.expanded_nodes,
            generated_nodes = self.generated_nodes,
            evaluated_nodes = self.evaluated_nodes,
            "search finished"
        );
    }
}
