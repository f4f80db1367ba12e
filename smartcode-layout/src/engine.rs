use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smartcode_core::{Bounds, Direction, GraphEdge, GraphNode, LayoutPosition, NodeSize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::graph::CallGraph;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Malformed graph: edge {edge} references unknown node {node}")]
    MalformedGraph { edge: String, node: String },
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("Cycle detected through node {0}")]
    Cycle(String),
}

/// Geometry and iteration knobs for [`LayeredLayout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub node_size: NodeSize,
    /// Gutter between consecutive ranks along the primary axis.
    pub rank_gap: f32,
    /// Gutter between nodes sharing a rank along the secondary axis.
    pub node_gap: f32,
    /// Upper bound on barycenter sweep rounds.
    pub max_sweeps: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::LeftToRight,
            node_size: NodeSize::default(),
            rank_gap: 50.0,
            node_gap: 50.0,
            max_sweeps: 8,
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_node_size(mut self, node_size: NodeSize) -> Self {
        self.node_size = node_size;
        self
    }
}

/// Result of one layout pass. Maps preserve the input node order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayout {
    pub positions: IndexMap<String, LayoutPosition>,
    pub ranks: IndexMap<String, usize>,
    pub rank_count: usize,
    /// Crossings between edges joining adjacent ranks. Edges that span
    /// several ranks get no dummy vertices and are not counted.
    pub crossings: usize,
    pub bounds: Bounds,
}

impl GraphLayout {
    pub fn position(&self, id: &str) -> Option<LayoutPosition> {
        self.positions.get(id).copied()
    }

    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Index-based adjacency built from validated node/edge lists.
struct RankGraph {
    n: usize,
    succ: Vec<Vec<usize>>,
    pred: Vec<Vec<usize>>,
}

impl RankGraph {
    fn build(nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<Self, LayoutError> {
        let n = nodes.len();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        index.reserve(n);
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.as_str(), i).is_some() {
                return Err(LayoutError::DuplicateNode(node.id.clone()));
            }
        }

        let lookup = |edge: &GraphEdge, endpoint: &String| {
            index
                .get(endpoint.as_str())
                .copied()
                .ok_or_else(|| LayoutError::MalformedGraph {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                })
        };

        let mut succ = vec![Vec::new(); n];
        let mut pred = vec![Vec::new(); n];
        for edge in edges {
            let s = lookup(edge, &edge.source)?;
            let t = lookup(edge, &edge.target)?;
            succ[s].push(t);
            pred[t].push(s);
        }
        for list in succ.iter_mut().chain(pred.iter_mut()) {
            list.sort_unstable();
        }

        Ok(Self { n, succ, pred })
    }

    /// Longest-path layering over a Kahn topological order.
    ///
    /// Returns the index of a node on a cycle when no full order exists.
    fn assign_ranks(&self) -> Result<Vec<usize>, usize> {
        let mut in_degree: Vec<usize> = self.pred.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..self.n).filter(|&v| in_degree[v] == 0).collect();
        let mut ranks = vec![0usize; self.n];
        let mut visited = 0usize;

        while let Some(u) = queue.pop_front() {
            visited += 1;
            for &v in &self.succ[u] {
                ranks[v] = ranks[v].max(ranks[u] + 1);
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        if visited < self.n {
            let stuck = (0..self.n).find(|&v| in_degree[v] > 0).unwrap_or(0);
            return Err(stuck);
        }
        Ok(ranks)
    }
}

// ---------------------------------------------------------------
// Ordering within ranks
// ---------------------------------------------------------------

fn build_rank_buckets(ranks: &[usize]) -> Vec<Vec<usize>> {
    let rank_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
    let mut buckets = vec![Vec::new(); rank_count];
    for (v, &r) in ranks.iter().enumerate() {
        buckets[r].push(v);
    }
    buckets
}

fn slots_of(order: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut slot = vec![0usize; n];
    for bucket in order {
        for (i, &v) in bucket.iter().enumerate() {
            slot[v] = i;
        }
    }
    slot
}

/// Reorder one rank by the mean slot of `neighbors`. Nodes without
/// neighbours keep their current slot as their score; the sort is stable
/// so ties keep the previous relative order.
fn reorder_rank(bucket: &mut [usize], neighbors: &[Vec<usize>], slot: &[usize]) {
    let mut scored: Vec<(usize, f64)> = bucket
        .iter()
        .map(|&v| {
            let adj = &neighbors[v];
            let score = if adj.is_empty() {
                slot[v] as f64
            } else {
                adj.iter().map(|&u| slot[u] as f64).sum::<f64>() / adj.len() as f64
            };
            (v, score)
        })
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (dst, (v, _)) in bucket.iter_mut().zip(scored) {
        *dst = v;
    }
}

/// Pairwise crossings among edges running from `upper` straight into
/// `lower`; longer edges are skipped.
fn count_crossings(upper: &[usize], lower: &[usize], graph: &RankGraph, slot: &[usize]) -> usize {
    let mut in_lower = vec![false; graph.n];
    for &v in lower {
        in_lower[v] = true;
    }

    let mut segments: Vec<(usize, usize)> = Vec::new();
    for &u in upper {
        for &v in &graph.succ[u] {
            if in_lower[v] {
                segments.push((slot[u], slot[v]));
            }
        }
    }

    let mut crossings = 0;
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (a1, b1) = segments[i];
            let (a2, b2) = segments[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(order: &[Vec<usize>], graph: &RankGraph) -> usize {
    let slot = slots_of(order, graph.n);
    order
        .windows(2)
        .map(|pair| count_crossings(&pair[0], &pair[1], graph, &slot))
        .sum()
}

/// Alternating forward/backward barycenter sweeps, keeping the best
/// ordering seen. Stops at zero crossings or when a round brings no gain.
fn minimize_crossings(order: &mut Vec<Vec<usize>>, graph: &RankGraph, max_sweeps: usize) -> usize {
    let mut best = total_crossings(order, graph);
    if order.len() < 2 || best == 0 {
        return best;
    }
    let mut best_order = order.clone();

    for _ in 0..max_sweeps {
        for r in 1..order.len() {
            let slot = slots_of(order, graph.n);
            reorder_rank(&mut order[r], &graph.pred, &slot);
        }
        for r in (0..order.len() - 1).rev() {
            let slot = slots_of(order, graph.n);
            reorder_rank(&mut order[r], &graph.succ, &slot);
        }

        let crossings = total_crossings(order, graph);
        if crossings < best {
            best = crossings;
            best_order = order.clone();
            if best == 0 {
                break;
            }
        } else {
            break;
        }
    }

    *order = best_order;
    best
}

// ---------------------------------------------------------------
// Engine
// ---------------------------------------------------------------

/// Layered (Sugiyama-style) layout for small directed acyclic graphs.
///
/// Stateless: every call recomputes from the given nodes and edges, so
/// identical input always yields identical positions.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayout {
    options: LayoutOptions,
}

impl LayeredLayout {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn compute_graph(&self, graph: &CallGraph) -> Result<GraphLayout, LayoutError> {
        self.compute(&graph.nodes, &graph.edges)
    }

    pub fn compute(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
    ) -> Result<GraphLayout, LayoutError> {
        let graph = RankGraph::build(nodes, edges)?;
        let ranks = graph
            .assign_ranks()
            .map_err(|v| LayoutError::Cycle(nodes[v].id.clone()))?;

        let mut order = build_rank_buckets(&ranks);
        let crossings = minimize_crossings(&mut order, &graph, self.options.max_sweeps);
        let coords = self.assign_coordinates(&order, graph.n);

        let mut positions = IndexMap::with_capacity(nodes.len());
        let mut rank_map = IndexMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            positions.insert(node.id.clone(), coords[i]);
            rank_map.insert(node.id.clone(), ranks[i]);
        }

        let layout = GraphLayout {
            positions,
            ranks: rank_map,
            rank_count: order.len(),
            crossings,
            bounds: self.bounds(&order),
        };

        log::debug!(
            "Layered layout ({}): {} nodes, {} ranks, {} crossings",
            self.options.direction,
            layout.len(),
            layout.rank_count,
            layout.crossings
        );
        Ok(layout)
    }

    /// (primary extent, secondary extent) of one node box.
    fn extents(&self) -> (f32, f32) {
        let size = self.options.node_size;
        if self.options.direction.is_horizontal() {
            (size.width, size.height)
        } else {
            (size.height, size.width)
        }
    }

    fn steps(&self) -> (f32, f32) {
        let (primary, secondary) = self.extents();
        (primary + self.options.rank_gap, secondary + self.options.node_gap)
    }

    fn assign_coordinates(&self, order: &[Vec<usize>], n: usize) -> Vec<LayoutPosition> {
        let (primary_step, secondary_step) = self.steps();
        let widest = order.iter().map(Vec::len).max().unwrap_or(0);
        let mut coords = vec![LayoutPosition::default(); n];

        for (rank, bucket) in order.iter().enumerate() {
            let offset = (widest - bucket.len()) as f32 * secondary_step / 2.0;
            let primary = rank as f32 * primary_step;
            for (slot, &v) in bucket.iter().enumerate() {
                let secondary = offset + slot as f32 * secondary_step;
                coords[v] = if self.options.direction.is_horizontal() {
                    LayoutPosition::new(primary, secondary)
                } else {
                    LayoutPosition::new(secondary, primary)
                };
            }
        }
        coords
    }

    fn bounds(&self, order: &[Vec<usize>]) -> Bounds {
        let widest = order.iter().map(Vec::len).max().unwrap_or(0);
        if widest == 0 {
            return Bounds::default();
        }
        let (primary_step, secondary_step) = self.steps();
        let primary = order.len() as f32 * primary_step - self.options.rank_gap;
        let secondary = widest as f32 * secondary_step - self.options.node_gap;
        let (width, height) = if self.options.direction.is_horizontal() {
            (primary, secondary)
        } else {
            (secondary, primary)
        };
        Bounds { x: 0.0, y: 0.0, width, height }
    }
}

/// One-shot layout with default gutters.
pub fn layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    direction: Direction,
    node_size: NodeSize,
) -> Result<GraphLayout, LayoutError> {
    let options = LayoutOptions::default()
        .with_direction(direction)
        .with_node_size(node_size);
    LayeredLayout::new(options).compute(nodes, edges)
}

// ===================================================================
// Tests
// ===================================================================
