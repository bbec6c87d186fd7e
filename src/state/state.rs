//! World snapshots and the puzzle mechanics. A [`State`] owns the dynamic
//! objects (agents and boxes) and the goal mask, and shares the static wall
//! layout with every other state of the session. Parent/action links live in
//! the search arena, not here.

use crate::heuristics::HeuristicValue;
use crate::level::{Color, Direction, Position, WallMap};
use crate::state::{Action, Overlay};
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

/// Single-character class identifier. Digits are agents, upper-case letters
/// are boxes and goals. Multiple objects may share a key.
pub type Key = char;

type Objects = BTreeMap<Key, Vec<(Position, Color)>>;

#[derive(Debug, Clone)]
pub struct State {
    map: Rc<WallMap>,
    agents: Objects,
    boxes: Objects,
    goals: Objects,
    /// Path cost from the root state.
    pub g: u32,
    /// Heuristic estimate, written in place by a [`crate::heuristics::Heuristic`].
    pub h: HeuristicValue,
    /// Priority value, written in place alongside `h`.
    pub f: HeuristicValue,
    /// Logical time index, meaningful when an overlay is present.
    pub t: u32,
    /// Layout hashes of every state expanded so far, shared across the
    /// states spawned from one root. Grows monotonically along any branch.
    explored: Rc<RefCell<HashSet<u64>>>,
    overlay: Option<Rc<Overlay>>,
}

impl State {
    pub fn new(map: Rc<WallMap>) -> Self {
        Self {
            map,
            agents: Objects::new(),
            boxes: Objects::new(),
            goals: Objects::new(),
            g: 0,
            h: OrderedFloat(f64::INFINITY),
            f: OrderedFloat(f64::INFINITY),
            t: 0,
            explored: Rc::new(RefCell::new(HashSet::new())),
            overlay: None,
        }
    }

    pub fn add_agent(&mut self, key: Key, position: Position, color: Color) {
        self.agents.entry(key).or_default().push((position, color));
    }

    pub fn add_box(&mut self, key: Key, position: Position, color: Color) {
        self.boxes.entry(key).or_default().push((position, color));
    }

    pub fn add_goal(&mut self, key: Key, position: Position, color: Color) {
        let entries = self.goals.entry(key).or_default();
        if !entries.contains(&(position, color)) {
            entries.push((position, color));
        }
    }

    pub fn map(&self) -> &Rc<WallMap> {
        &self.map
    }

    pub fn agents(&self) -> &Objects {
        &self.agents
    }

    pub fn boxes(&self) -> &Objects {
        &self.boxes
    }

    pub fn goals(&self) -> &Objects {
        &self.goals
    }

    pub fn agents_by_key(&self, key: Key) -> &[(Position, Color)] {
        self.agents.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn boxes_by_key(&self, key: Key) -> &[(Position, Color)] {
        self.boxes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn goals_by_key(&self, key: Key) -> &[(Position, Color)] {
        self.goals.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First agent in key order, the planning subject of a subtask.
    pub fn first_agent(&self) -> Option<(Key, Position, Color)> {
        self.agents
            .iter()
            .flat_map(|(key, entries)| entries.iter().map(|(p, c)| (*key, *p, *c)))
            .next()
    }

    /// Current position of the first object with the given key, boxes before
    /// agents. Used for timeline extraction.
    pub fn position_of(&self, key: Key) -> Option<Position> {
        self.boxes_by_key(key)
            .first()
            .or_else(|| self.agents_by_key(key).first())
            .map(|(position, _)| *position)
    }

    pub fn overlay(&self) -> Option<&Rc<Overlay>> {
        self.overlay.as_ref()
    }

    /// Merge the goals of another task into this one.
    pub fn merge_goals(&mut self, other: &State) {
        for (key, entries) in other.goals() {
            for (position, color) in entries {
                self.add_goal(*key, *position, *color);
            }
        }
    }

    /// Attach the committed moves of an external object. Its static copy, if
    /// present, is removed: occupancy now comes from the overlay alone. The
    /// local clock restarts so the timelines line up.
    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        if let Some(start) = overlay.starting_position() {
            if let Some(entries) = self.boxes.get_mut(&overlay.key()) {
                if let Some(i) = entries.iter().position(|(p, _)| *p == start) {
                    entries.remove(i);
                }
                if entries.is_empty() {
                    self.boxes.remove(&overlay.key());
                }
            }
        }
        self.overlay = Some(Rc::new(overlay));
        self.t = 0;
        self
    }

    /// Reset the exploration memory, used before a re-plan once the world
    /// model has changed. The old set may still be aliased by stale states,
    /// so this installs a fresh one rather than clearing in place.
    pub fn forget_exploration(&mut self) {
        self.explored = Rc::new(RefCell::new(HashSet::new()));
    }

    pub fn explored_len(&self) -> usize {
        self.explored.borrow().len()
    }

    pub fn was_explored(&self, hash: u64) -> bool {
        self.explored.borrow().contains(&hash)
    }

    /// Layout hash blocking re-expansion. The time index only participates
    /// when an overlay makes occupancy time-dependent, and saturates at the
    /// overlay horizon past which occupancy is static again.
    pub fn canonical_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (key, entries) in &self.agents {
            key.hash(&mut hasher);
            let mut sorted = entries.clone();
            sorted.sort();
            sorted.hash(&mut hasher);
        }
        for (key, entries) in &self.boxes {
            key.hash(&mut hasher);
            let mut sorted = entries.clone();
            sorted.sort();
            sorted.hash(&mut hasher);
        }
        if let Some(overlay) = &self.overlay {
            self.t.min(overlay.horizon() + 1).hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Every goal cell holds a box of the matching key and colour. Trivially
    /// true for an empty goal set.
    pub fn is_goal_state(&self) -> bool {
        self.goals.iter().all(|(key, entries)| {
            entries.iter().all(|(position, color)| {
                self.boxes_by_key(*key)
                    .iter()
                    .any(|(box_position, box_color)| {
                        box_position == position && box_color == color
                    })
            })
        })
    }

    fn occupied_at(&self, position: &Position, t: u32) -> bool {
        let by_objects = self
            .agents
            .values()
            .chain(self.boxes.values())
            .flatten()
            .any(|(p, _)| p == position);
        by_objects
            || self
                .overlay
                .as_ref()
                .and_then(|overlay| overlay.position_at(t))
                .is_some_and(|p| p == *position)
    }

    fn cell_free(&self, position: &Position, t: u32) -> bool {
        self.map.is_free(position) && !self.occupied_at(position, t)
    }

    fn box_of_color_at(&self, position: &Position, color: Color) -> Option<(Key, usize)> {
        for (key, entries) in &self.boxes {
            for (i, (p, c)) in entries.iter().enumerate() {
                if p == position && *c == color {
                    return Some((*key, i));
                }
            }
        }
        None
    }

    fn child(&self) -> State {
        let mut child = self.clone();
        child.g = self.g + 1;
        child.t = self.t + 1;
        child.h = OrderedFloat(f64::INFINITY);
        child.f = OrderedFloat(f64::INFINITY);
        child
    }

    /// Apply a single-agent action, returning the successor when legal.
    pub fn apply(&self, agent: Key, action: Action) -> Option<State> {
        let (agent_position, agent_color) = *self.agents.get(&agent)?.first()?;
        let t_next = self.t + 1;
        match action {
            Action::NoOp => Some(self.child()),
            Action::Move(direction) => {
                let target = agent_position.step(direction);
                if !self.cell_free(&target, t_next) {
                    return None;
                }
                let mut child = self.child();
                child.agents.get_mut(&agent)?.first_mut()?.0 = target;
                Some(child)
            }
            Action::Push(direction) => {
                let box_position = agent_position.step(direction);
                let (box_key, box_index) =
                    self.box_of_color_at(&box_position, agent_color)?;
                let box_target = box_position.step(direction);
                if !self.cell_free(&box_target, t_next) {
                    return None;
                }
                let mut child = self.child();
                child.agents.get_mut(&agent)?.first_mut()?.0 = box_position;
                child.boxes.get_mut(&box_key)?.get_mut(box_index)?.0 = box_target;
                Some(child)
            }
            Action::Pull(direction) => {
                let target = agent_position.step(direction);
                if !self.cell_free(&target, t_next) {
                    return None;
                }
                let box_position = agent_position.step(direction.opposite());
                let (box_key, box_index) =
                    self.box_of_color_at(&box_position, agent_color)?;
                let mut child = self.child();
                child.agents.get_mut(&agent)?.first_mut()?.0 = target;
                child.boxes.get_mut(&box_key)?.get_mut(box_index)?.0 = agent_position;
                Some(child)
            }
        }
    }

    /// Enumerate the legal children reachable by one action, each costing 1.
    /// Children whose layout was already expanded are suppressed. Waiting is
    /// only generated while an overlay still has moves ahead.
    pub fn successors(&self) -> Vec<(Key, Action, State)> {
        self.explored.borrow_mut().insert(self.canonical_hash());
        let can_wait = self
            .overlay
            .as_ref()
            .is_some_and(|overlay| self.t <= overlay.horizon());
        let agent_keys: Vec<Key> = self.agents.keys().copied().collect();
        let mut children = Vec::new();
        for agent in agent_keys {
            let mut actions: Vec<Action> = Vec::with_capacity(13);
            for direction in Direction::ALL {
                actions.push(Action::Move(direction));
                actions.push(Action::Push(direction));
                actions.push(Action::Pull(direction));
            }
            if can_wait {
                actions.push(Action::NoOp);
            }
            for action in actions {
                if let Some(child) = self.apply(agent, action) {
                    if self.was_explored(child.canonical_hash()) {
                        continue;
                    }
                    children.push((agent, action, child));
                }
            }
        }
        children
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.map.rows() as i16 {
            for col in 0..self.map.cols() as i16 {
                let position = Position::new(row, col);
                let mut cell = if self.map.is_wall(&position) { '+' } else { ' ' };
                for (key, entries) in self.goals.iter() {
                    if entries.iter().any(|(p, _)| *p == position) {
                        cell = key.to_ascii_lowercase();
                    }
                }
                for (key, entries) in self.agents.iter().chain(self.boxes.iter()) {
                    if entries.iter().any(|(p, _)| *p == position) {
                        cell = *key;
                    }
                }
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{initial_state, CORRIDOR_PUSH_LEVEL, TRIVIAL_LEVEL};

    #[test]
    fn goal_state_detection() {
        let state = initial_state(TRIVIAL_LEVEL);
        assert!(state.is_goal_state());
        let corridor = initial_state(CORRIDOR_PUSH_LEVEL);
        assert!(!corridor.is_goal_state());
    }

    #[test]
    fn empty_goal_set_is_trivially_satisfied() {
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        state.goals = Objects::new();
        assert!(state.is_goal_state());
    }

    #[test]
    fn successors_respect_walls_and_cost() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let children = state.successors();
        assert!(!children.is_empty());
        for (_, _, child) in &children {
            assert_eq!(child.g, state.g + 1);
            assert_eq!(child.t, state.t + 1);
            let (_, position, _) = child.first_agent().unwrap();
            assert!(child.map().is_free(&position));
        }
        assert!(children
            .iter()
            .any(|(_, action, _)| *action == Action::Move(Direction::East)));
        assert!(!children
            .iter()
            .any(|(_, action, _)| *action == Action::Move(Direction::North)));
    }

    #[test]
    fn push_moves_agent_and_box_together() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let (agent, _, _) = state.first_agent().unwrap();
        let moved = state.apply(agent, Action::Move(Direction::East)).unwrap();
        let pushed = moved.apply(agent, Action::Push(Direction::East)).unwrap();
        let (_, agent_position, _) = pushed.first_agent().unwrap();
        assert_eq!(agent_position, Position::new(1, 3));
        assert_eq!(pushed.position_of('A'), Some(Position::new(1, 4)));
        assert!(pushed.is_goal_state());
    }

    #[test]
    fn pull_drags_the_box_behind() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let (agent, _, _) = state.first_agent().unwrap();
        // Walk next to the box, then pull it back west.
        let beside = state
            .apply(agent, Action::Move(Direction::East))
            .and_then(|s| s.apply(agent, Action::Push(Direction::East)))
            .unwrap();
        let pulled = beside.apply(agent, Action::Pull(Direction::West)).unwrap();
        let (_, agent_position, _) = pulled.first_agent().unwrap();
        assert_eq!(agent_position, Position::new(1, 2));
        assert_eq!(pulled.position_of('A'), Some(Position::new(1, 3)));
    }

    #[test]
    fn branch_exploration_blocks_backtracking() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let (agent, _, _) = state.first_agent().unwrap();
        let children = state.successors();
        let (_, _, moved) = children
            .iter()
            .find(|(_, action, _)| *action == Action::Move(Direction::East))
            .unwrap();
        // Moving back west would reproduce the parent layout.
        assert!(!moved
            .successors()
            .iter()
            .any(|(a, action, _)| *a == agent && *action == Action::Move(Direction::West)));
    }

    #[test]
    fn exploration_memory_grows_monotonically() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        assert_eq!(state.explored_len(), 0);
        let children = state.successors();
        assert_eq!(state.explored_len(), 1);
        assert!(state.was_explored(state.canonical_hash()));
        let (_, _, next) = children.into_iter().next().unwrap();
        next.successors();
        // The memory is shared down the branch and only ever grows.
        assert_eq!(state.explored_len(), 2);
        // Forgetting detaches this state from the shared memory.
        let mut fresh = next.clone();
        fresh.forget_exploration();
        assert_eq!(fresh.explored_len(), 0);
        assert_eq!(next.explored_len(), 2);
    }

    #[test]
    fn overlay_blocks_cells_over_time() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let overlay = Overlay::from_timeline(
            'A',
            &[(0, Position::new(1, 3)), (1, Position::new(1, 4))],
        );
        let state = state.with_overlay(overlay);
        // The box is now tracked by the overlay, not the static map.
        assert!(state.boxes_by_key('A').is_empty());
        let (agent, _, _) = state.first_agent().unwrap();
        let moved = state.apply(agent, Action::Move(Direction::East)).unwrap();
        // The box vacated (1,3) at t=1, so the agent may enter it at t=2.
        let at_box_cell = moved.apply(agent, Action::Move(Direction::East)).unwrap();
        // Its resting cell stays blocked after the timeline ends.
        assert!(at_box_cell
            .apply(agent, Action::Move(Direction::East))
            .is_none());
        // Waiting becomes available under an overlay.
        assert!(state
            .successors()
            .iter()
            .any(|(_, action, _)| *action == Action::NoOp));
    }
}
