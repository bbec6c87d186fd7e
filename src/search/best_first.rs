//! Best-first search kernel. The frontier is a priority queue over arena
//! node ids, keyed by `(priority, tiebreak)` where the tiebreak is a
//! per-search monotonic counter: equal priorities pop in insertion order and
//! the queue never has to compare states.

use crate::heuristics::{Heuristic, HeuristicValue};
use crate::level::Position;
use crate::search::{NodeId, SearchSpace, SearchStatistics};
use crate::state::{Action, Key, Plan, State, Timeline};
use priority_queue::PriorityQueue;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::fmt;
use std::rc::Rc;

/// Queue ordering. A\* (and its weighted alias) orders by `f` as written by
/// the heuristic, Greedy by `h` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    AStar,
    WAStar,
    Greedy,
}

impl Strategy {
    fn priority(&self, state: &State) -> HeuristicValue {
        match self {
            Strategy::AStar | Strategy::WAStar => state.f,
            Strategy::Greedy => state.h,
        }
    }
}

/// One best-first search over a task. Construction scores the initial state
/// and makes it the current leaf; the caller drives the explore/pop loop.
pub struct BestFirst {
    strategy: Strategy,
    heuristic: Rc<RefCell<dyn Heuristic>>,
    space: SearchSpace,
    frontier: PriorityQueue<NodeId, Reverse<(HeuristicValue, u64)>>,
    leaf: NodeId,
    tiebreak: u64,
    statistics: SearchStatistics,
}

impl BestFirst {
    pub fn new(
        mut initial: State,
        strategy: Strategy,
        heuristic: Rc<RefCell<dyn Heuristic>>,
    ) -> Self {
        heuristic.borrow_mut().evaluate(&mut initial);
        let space = SearchSpace::new(initial);
        let leaf = space.root();
        Self {
            strategy,
            heuristic,
            space,
            frontier: PriorityQueue::new(),
            leaf,
            tiebreak: 0,
            statistics: SearchStatistics::new(),
        }
    }

    pub fn leaf(&self) -> &State {
        self.space.state(self.leaf)
    }

    pub fn is_leaf_goal(&self) -> bool {
        self.leaf().is_goal_state()
    }

    /// Expand the current leaf: generate its children, batch-score them, and
    /// push each onto the frontier.
    pub fn explore_and_add(&mut self) {
        self.space.mark_expanded(self.leaf);
        let children = self.space.state(self.leaf).successors();
        self.statistics.increment_expanded_nodes();
        self.statistics.increment_generated_nodes(children.len());
        let (transitions, mut states): (Vec<(Key, Action)>, Vec<State>) = children
            .into_iter()
            .map(|(agent, action, state)| ((agent, action), state))
            .unzip();
        self.heuristic.borrow_mut().evaluate_batch(&mut states);
        for ((agent, action), child) in transitions.into_iter().zip(states) {
            self.statistics.increment_evaluated_nodes();
            self.statistics.register_heuristic_value(child.h);
            let priority = self.strategy.priority(&child);
            let id = self.space.insert(child, self.leaf, agent, action);
            self.tiebreak += 1;
            self.frontier.push(id, Reverse((priority, self.tiebreak)));
        }
    }

    pub fn frontier_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Pop the least-priority entry and make it the current leaf.
    pub fn get_and_remove_leaf(&mut self) {
        if let Some((id, _)) = self.frontier.pop() {
            self.leaf = id;
        }
    }

    /// Reconstruct the action sequence from the root to the current leaf.
    pub fn walk_best_path(&self) -> Plan {
        self.space.extract_plan(self.leaf)
    }

    /// The trajectory of the object `key` along the best path.
    pub fn timeline_of(&self, key: Key) -> Timeline {
        self.space.extract_timeline(self.leaf, key)
    }

    /// Positions of `key` across every expanded state of this search.
    pub fn position_trace(&self, key: Key) -> Vec<Position> {
        self.space.position_trace(key)
    }

    pub fn nodes_explored(&self) -> u64 {
        self.statistics.expanded_nodes()
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }
}

impl fmt::Debug for BestFirst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestFirst")
            .field("strategy", &self.strategy)
            .field("space", &self.space)
            .field("frontier", &self.frontier.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::EasyRule;
    use crate::test_utils::{initial_state, CORRIDOR_PUSH_LEVEL, TRIVIAL_LEVEL};

    fn kernel(level: &str, strategy: Strategy) -> BestFirst {
        BestFirst::new(
            initial_state(level),
            strategy,
            Rc::new(RefCell::new(EasyRule::new())),
        )
    }

    fn run(kernel: &mut BestFirst) -> Option<Plan> {
        if kernel.is_leaf_goal() {
            return Some(vec![]);
        }
        loop {
            kernel.explore_and_add();
            if kernel.frontier_empty() {
                return None;
            }
            kernel.get_and_remove_leaf();
            if kernel.is_leaf_goal() {
                return Some(kernel.walk_best_path());
            }
        }
    }

    #[test]
    fn solved_task_needs_no_search() {
        let mut kernel = kernel(TRIVIAL_LEVEL, Strategy::AStar);
        assert_eq!(run(&mut kernel), Some(vec![]));
        assert_eq!(kernel.nodes_explored(), 0);
    }

    #[test]
    fn corridor_push_takes_two_actions() {
        for strategy in [Strategy::AStar, Strategy::WAStar, Strategy::Greedy] {
            let mut kernel = kernel(CORRIDOR_PUSH_LEVEL, strategy);
            let plan = run(&mut kernel).unwrap();
            assert_eq!(plan.len(), 2);
            assert_eq!(plan[1], Action::Push(crate::level::Direction::East));
        }
    }

    #[test]
    fn plan_length_equals_goal_cost() {
        let mut kernel = kernel(CORRIDOR_PUSH_LEVEL, Strategy::AStar);
        let plan = run(&mut kernel).unwrap();
        assert_eq!(plan.len() as u32, kernel.leaf().g);
    }

    #[test]
    fn replaying_the_plan_reaches_the_goal() {
        let mut kernel = kernel(CORRIDOR_PUSH_LEVEL, Strategy::AStar);
        let plan = run(&mut kernel).unwrap();
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        let (agent, _, _) = state.first_agent().unwrap();
        for action in plan {
            state = state.apply(agent, action).unwrap();
        }
        assert!(state.is_goal_state());
        // Cell for cell the same layout as the search's goal leaf.
        assert_eq!(state.canonical_hash(), kernel.leaf().canonical_hash());
    }

    #[test]
    fn timeline_tracks_the_box() {
        let mut kernel = kernel(CORRIDOR_PUSH_LEVEL, Strategy::AStar);
        run(&mut kernel).unwrap();
        let timeline = kernel.timeline_of('A');
        assert_eq!(timeline.first().map(|(t, _)| *t), Some(0));
        assert_eq!(timeline.len(), 3);
        assert_ne!(timeline.first(), timeline.last());
    }

    #[test]
    fn pops_least_priority_first() {
        let mut kernel = kernel(CORRIDOR_PUSH_LEVEL, Strategy::AStar);
        kernel.explore_and_add();
        kernel.get_and_remove_leaf();
        kernel.explore_and_add();
        kernel.get_and_remove_leaf();
        // Two frontier children remain after the second expansion: pushing
        // the box onto its goal (f = 2) and pulling it backwards (f = 17).
        // The cheap one must pop first.
        assert!(kernel.is_leaf_goal());
        assert_eq!(kernel.leaf().g, 2);
    }

    #[test]
    fn equal_priorities_pop_in_insertion_order() {
        let mut queue: PriorityQueue<NodeId, Reverse<(HeuristicValue, u64)>> =
            PriorityQueue::new();
        let space = SearchSpace::new(initial_state(TRIVIAL_LEVEL));
        let first = space.root();
        queue.push(first, Reverse((HeuristicValue::from(1.0), 1)));
        let mut other = SearchSpace::new(initial_state(TRIVIAL_LEVEL));
        let second = other.insert(
            initial_state(TRIVIAL_LEVEL),
            other.root(),
            '0',
            Action::NoOp,
        );
        queue.push(second, Reverse((HeuristicValue::from(1.0), 2)));
        assert_eq!(queue.pop().map(|(id, _)| id), Some(first));
        assert_eq!(queue.pop().map(|(id, _)| id), Some(second));
    }
}
