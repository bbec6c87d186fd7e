//! Visibility-graph heuristic. The wall contours of the map are walked once
//! to extract corner keypoints; consecutive keypoints of a contour become
//! Manhattan-weighted edges of a shared directed graph. A distance query
//! hooks its two endpoints into the graph through at most four L-probe
//! visible anchors each and runs a bidirectional Dijkstra; the base graph is
//! never mutated, so re-planning reuses it as is.

use crate::heuristics::Heuristic;
use crate::level::{Position, WallMap};
use crate::state::State;
use itertools::Itertools;
use lru::LruCache;
use ordered_float::OrderedFloat;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// The keypoints a query position can reach with a straight L-shaped probe.
type Anchors = SmallVec<[Position; 4]>;

const MAX_ANCHORS: usize = 4;
const ANCHOR_CACHE_SIZE: usize = 4096;

/// Contour walk directions, east/south/west/north. The walker keeps the
/// wall on its left hand, so a left turn marks a concave corner.
const WALK_DIRS: [(i16, i16); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

pub struct VisibilityGraph {
    map: Rc<WallMap>,
    graph: DiGraph<Position, f64>,
    nodes: HashMap<Position, NodeIndex>,
    keypoints: Vec<Position>,
    anchor_cache: LruCache<Position, Anchors>,
}

impl VisibilityGraph {
    /// Build the keypoint graph for the level of the given state. Walls are
    /// immutable, so this runs once per planning session.
    pub fn new(state: &State) -> Self {
        let map = Rc::clone(state.map());
        let mut visited_walls: HashSet<Position> = HashSet::new();
        let mut contours: Vec<Vec<Position>> = Vec::new();
        for col in 1..map.cols() as i16 {
            for row in 1..map.rows() as i16 {
                let wall = Position::new(row, col);
                let west = Position::new(row, col - 1);
                if map.is_wall(&wall)
                    && map.is_free(&west)
                    && !visited_walls.contains(&wall)
                {
                    visited_walls.insert(wall);
                    let corners = trace_contour(&map, west, &mut visited_walls);
                    if !corners.is_empty() {
                        contours.push(corners);
                    }
                }
            }
        }

        let mut graph = DiGraph::new();
        let mut nodes: HashMap<Position, NodeIndex> = HashMap::new();
        let mut keypoints: Vec<Position> = Vec::new();
        let mut node_of = |graph: &mut DiGraph<Position, f64>, position: Position| {
            *nodes.entry(position).or_insert_with(|| {
                keypoints.push(position);
                graph.add_node(position)
            })
        };
        for contour in &contours {
            for (a, b) in contour.iter().copied().circular_tuple_windows() {
                if a == b {
                    continue;
                }
                let weight = f64::from(a.manhattan(&b));
                let ia = node_of(&mut graph, a);
                let ib = node_of(&mut graph, b);
                graph.add_edge(ia, ib, weight);
                graph.add_edge(ib, ia, weight);
            }
        }

        Self {
            map,
            graph,
            nodes,
            keypoints,
            anchor_cache: LruCache::new(
                NonZeroUsize::new(ANCHOR_CACHE_SIZE).unwrap(),
            ),
        }
    }

    pub fn keypoints(&self) -> &[Position] {
        &self.keypoints
    }

    /// The up-to-four nearest keypoints visible from `position`, memoised
    /// per position since endpoints rarely move between re-plans.
    pub fn anchors(&mut self, position: Position) -> Anchors {
        if let Some(hit) = self.anchor_cache.get(&position) {
            return hit.clone();
        }
        let mut sorted = self.keypoints.clone();
        sorted.sort_by_key(|keypoint| position.manhattan(keypoint));
        let mut anchors = Anchors::new();
        for keypoint in sorted {
            if anchors.len() >= MAX_ANCHORS {
                break;
            }
            if l_probe_clear(&self.map, &position, &keypoint) {
                anchors.push(keypoint);
            }
        }
        self.anchor_cache.put(position, anchors.clone());
        anchors
    }

    /// Estimated walking distance between two cells. Mutually visible
    /// endpoints short-circuit to their Manhattan distance, which makes the
    /// estimate exact on open ground.
    pub fn query(&mut self, from: Position, to: Position) -> f64 {
        if from == to {
            return 0.0;
        }
        if l_probe_clear(&self.map, &from, &to) || l_probe_clear(&self.map, &to, &from) {
            return f64::from(from.manhattan(&to));
        }
        let source_anchors = self.anchors(from);
        let target_anchors = self.anchors(to);
        if source_anchors.is_empty() || target_anchors.is_empty() {
            return f64::INFINITY;
        }
        self.bidirectional_dijkstra(from, to, &source_anchors, &target_anchors)
    }

    fn forward_edges(
        &self,
        position: Position,
        from: Position,
        to: Position,
        source_anchors: &Anchors,
        target_anchors: &Anchors,
    ) -> Vec<(Position, f64)> {
        let mut edges = Vec::new();
        if position == from {
            for anchor in source_anchors {
                edges.push((*anchor, f64::from(from.manhattan(anchor))));
            }
        }
        if let Some(&index) = self.nodes.get(&position) {
            for edge in self.graph.edges(index) {
                edges.push((self.graph[edge.target()], *edge.weight()));
            }
        }
        if target_anchors.contains(&position) {
            edges.push((to, f64::from(position.manhattan(&to))));
        }
        edges
    }

    fn backward_edges(
        &self,
        position: Position,
        from: Position,
        to: Position,
        source_anchors: &Anchors,
        target_anchors: &Anchors,
    ) -> Vec<(Position, f64)> {
        let mut edges = Vec::new();
        if position == to {
            for anchor in target_anchors {
                edges.push((*anchor, f64::from(to.manhattan(anchor))));
            }
        }
        if let Some(&index) = self.nodes.get(&position) {
            for edge in self
                .graph
                .edges_directed(index, petgraph::Direction::Incoming)
            {
                edges.push((self.graph[edge.source()], *edge.weight()));
            }
        }
        if source_anchors.contains(&position) {
            edges.push((from, f64::from(position.manhattan(&from))));
        }
        edges
    }

    /// Meet-in-the-middle Dijkstra with the query endpoints attached through
    /// their anchors only for the duration of the call.
    fn bidirectional_dijkstra(
        &self,
        from: Position,
        to: Position,
        source_anchors: &Anchors,
        target_anchors: &Anchors,
    ) -> f64 {
        let mut dist_forward: HashMap<Position, f64> = HashMap::from([(from, 0.0)]);
        let mut dist_backward: HashMap<Position, f64> = HashMap::from([(to, 0.0)]);
        let mut heap_forward = BinaryHeap::from([Reverse((OrderedFloat(0.0), from))]);
        let mut heap_backward = BinaryHeap::from([Reverse((OrderedFloat(0.0), to))]);
        let mut settled_forward: HashSet<Position> = HashSet::new();
        let mut settled_backward: HashSet<Position> = HashSet::new();
        let mut best = f64::INFINITY;

        loop {
            let top_forward = heap_forward
                .peek()
                .map_or(f64::INFINITY, |Reverse((d, _))| d.into_inner());
            let top_backward = heap_backward
                .peek()
                .map_or(f64::INFINITY, |Reverse((d, _))| d.into_inner());
            if top_forward + top_backward >= best {
                return best;
            }

            let forward = top_forward <= top_backward;
            let (heap, dist, settled, dist_other) = if forward {
                (
                    &mut heap_forward,
                    &mut dist_forward,
                    &mut settled_forward,
                    &dist_backward,
                )
            } else {
                (
                    &mut heap_backward,
                    &mut dist_backward,
                    &mut settled_backward,
                    &dist_forward,
                )
            };

            let Some(Reverse((d, position))) = heap.pop() else {
                return best;
            };
            if !settled.insert(position) {
                continue;
            }
            let d = d.into_inner();
            let edges = if forward {
                self.forward_edges(position, from, to, source_anchors, target_anchors)
            } else {
                self.backward_edges(position, from, to, source_anchors, target_anchors)
            };
            for (next, weight) in edges {
                let candidate = d + weight;
                if dist.get(&next).map_or(true, |&known| candidate < known) {
                    dist.insert(next, candidate);
                    heap.push(Reverse((OrderedFloat(candidate), next)));
                }
                if let Some(&other) = dist_other.get(&next) {
                    best = best.min(dist[&next] + other);
                }
            }
        }
    }
}

impl Heuristic for VisibilityGraph {
    /// `h` is the graph distance agent-to-box plus box-to-goal; re-planning
    /// reuses the cached anchors when the endpoints have not moved.
    fn evaluate(&mut self, state: &mut State) {
        let mut h = 0.0;
        if let Some((_, agent_position, _)) = state.first_agent() {
            let mut parts: Vec<(Position, Position)> = Vec::new();
            for (key, goals) in state.goals() {
                for (goal_position, _) in goals {
                    let Some(&(box_position, _)) = state.boxes_by_key(*key).first() else {
                        continue;
                    };
                    parts.push((agent_position, box_position));
                    parts.push((box_position, *goal_position));
                }
            }
            for (from, to) in parts {
                h += self.query(from, to);
            }
        }
        state.h = OrderedFloat(h);
        state.f = OrderedFloat(2.0 * h + f64::from(state.g));
    }
}

impl fmt::Debug for VisibilityGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityGraph")
            .field("keypoints", &self.keypoints.len())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

/// L-shaped wall probe: first row-wise, then column-wise.
fn l_probe_clear(map: &WallMap, from: &Position, to: &Position) -> bool {
    let row_step = (to.row - from.row).signum();
    let mut row = from.row;
    while row != to.row {
        row += row_step;
        if map.is_wall(&Position::new(row, from.col)) {
            return false;
        }
    }
    let col_step = (to.col - from.col).signum();
    let mut col = from.col;
    while col != to.col {
        col += col_step;
        if map.is_wall(&Position::new(to.row, col)) {
            return false;
        }
    }
    true
}

/// Walk one wall contour with the left hand on the wall, recording the free
/// cell at every concave corner. Walls bumped into along the way are marked
/// so the outer scan does not start the same contour twice.
fn trace_contour(
    map: &WallMap,
    start: Position,
    visited_walls: &mut HashSet<Position>,
) -> Vec<Position> {
    let mut corners = Vec::new();
    let mut position = start;
    // Pretend the walker arrived heading south so the first probe is east,
    // straight at the wall that triggered the scan.
    let mut previous_dir = 1usize;
    let mut initial_dir: Option<usize> = None;
    let mut first = true;
    let step_budget = 4 * map.rows() * map.cols();
    for _ in 0..step_budget {
        let mut moved = false;
        for turn in 0..4 {
            let dir = (previous_dir + 3 + turn) % 4;
            let (dr, dc) = WALK_DIRS[dir];
            let next = Position::new(position.row + dr, position.col + dc);
            if map.is_wall(&next) {
                visited_walls.insert(next);
                continue;
            }
            if turn == 0 && !first {
                corners.push(position);
            }
            let done = initial_dir == Some(dir) && position == start;
            if initial_dir.is_none() {
                initial_dir = Some(dir);
            }
            previous_dir = dir;
            position = next;
            first = false;
            moved = true;
            if done {
                return corners;
            }
            break;
        }
        if !moved {
            break;
        }
    }
    corners
}
