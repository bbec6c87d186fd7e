use crate::level::Position;
use crate::state::{Action, Key, Plan, State, Timeline};
use segvec::{Linear, SegVec};
use std::fmt;

/// Index of a state in the arena of one search. States form a parent-chain
/// DAG; keeping integer indices instead of owned back-pointers makes path
/// reconstruction a simple walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

struct SpaceNode {
    state: State,
    parent: Option<(NodeId, Key, Action)>,
    expanded: bool,
}

/// Arena of every state generated by one search instance.
pub struct SearchSpace {
    nodes: SegVec<SpaceNode, Linear>,
}

impl SearchSpace {
    pub fn new(root: State) -> Self {
        let mut nodes = SegVec::new();
        nodes.push(SpaceNode {
            state: root,
            parent: None,
            expanded: false,
        });
        Self { nodes }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn insert(
        &mut self,
        state: State,
        parent: NodeId,
        agent: Key,
        action: Action,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SpaceNode {
            state,
            parent: Some((parent, agent, action)),
            expanded: false,
        });
        id
    }

    pub fn state(&self, id: NodeId) -> &State {
        &self.node(id).state
    }

    pub fn mark_expanded(&mut self, id: NodeId) {
        self.nodes.get_mut(id.0).expect("invalid node id").expanded = true;
    }

    fn node(&self, id: NodeId) -> &SpaceNode {
        self.nodes.get(id.0).expect("invalid node id")
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reconstruct the action sequence from the root to `leaf`.
    pub fn extract_plan(&self, leaf: NodeId) -> Plan {
        let mut plan = Vec::new();
        let mut current = self.node(leaf);
        while let Some((parent, _, action)) = current.parent {
            plan.push(action);
            current = self.node(parent);
        }
        plan.reverse();
        plan
    }

    /// The `(t, position)` trajectory of the object `key` along the path
    /// from the root to `leaf`.
    pub fn extract_timeline(&self, leaf: NodeId, key: Key) -> Timeline {
        let mut timeline = Vec::new();
        let mut current = self.node(leaf);
        loop {
            if let Some(position) = current.state.position_of(key) {
                timeline.push((current.state.t, position));
            }
            match current.parent {
                Some((parent, _, _)) => current = self.node(parent),
                None => break,
            }
        }
        timeline.reverse();
        timeline
    }

    /// Positions the object `key` took in every expanded state, in expansion
    /// order. Used to diagnose where a failed search got stuck.
    pub fn position_trace(&self, key: Key) -> Vec<Position> {
        self.nodes
            .iter()
            .filter(|node| node.expanded)
            .filter_map(|node| node.state.position_of(key))
            .collect()
    }
}

impl fmt::Debug for SearchSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSpace")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
