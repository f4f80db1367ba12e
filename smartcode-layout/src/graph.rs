//! Call sequence → path graph.
//!
//! Node ids are derived from input position (`node-<index>`), so a
//! re-render with the same sequence always yields the same ids.

use smartcode_core::{GraphEdge, GraphNode};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

pub fn node_id(index: usize) -> String {
    format!("node-{index}")
}

pub fn edge_id(source: usize, target: usize) -> String {
    format!("edge-{source}-{target}")
}

impl CallGraph {
    /// One node per call, one edge per adjacent pair.
    pub fn from_calls<S: AsRef<str>>(calls: &[S]) -> Self {
        let nodes = calls
            .iter()
            .enumerate()
            .map(|(i, label)| GraphNode::new(node_id(i), label.as_ref()))
            .collect();

        let edges = (1..calls.len())
            .map(|i| GraphEdge::new(edge_id(i - 1, i), node_id(i - 1), node_id(i)))
            .collect();

        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_calls() {
        let graph = CallGraph::from_calls::<&str>(&[]);
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_single_call_has_no_edges() {
        let graph = CallGraph::from_calls(&["main"]);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.nodes[0], GraphNode::new("node-0", "main"));
    }

    #[test]
    fn test_four_calls_form_a_path() {
        let graph = CallGraph::from_calls(&["main", "parse", "validate", "render"]);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["node-0", "node-1", "node-2", "node-3"]);

        for (i, edge) in graph.edges.iter().enumerate() {
            assert_eq!(edge.source, node_id(i));
            assert_eq!(edge.target, node_id(i + 1));
        }
        assert_eq!(graph.edges[0].id, "edge-0-1");
    }

    #[test]
    fn test_duplicate_labels_get_distinct_ids() {
        let graph = CallGraph::from_calls(&["log", "log", "log"]);
        assert_eq!(graph.node_count(), 3);
        assert_ne!(graph.nodes[0].id, graph.nodes[1].id);
        assert_eq!(graph.nodes[2].label, "log");
    }

    #[test]
    fn test_n_nodes_n_minus_one_edges() {
        for n in 1..20 {
            let calls: Vec<String> = (0..n).map(|i| format!("f{i}")).collect();
            let graph = CallGraph::from_calls(&calls);
            assert_eq!(graph.node_count(), n);
            assert_eq!(graph.edge_count(), n - 1);
        }
    }

    #[test]
    fn test_deterministic() {
        let calls = ["a", "b", "a", "c"];
        assert_eq!(CallGraph::from_calls(&calls), CallGraph::from_calls(&calls));
    }
}
