//! Analysis → Render-scene bridge
//!
//! Derives the renderer's input (`RenderScene`) from an analyzer call
//! sequence. The bridge holds no mutable graph state of its own: every
//! change of input rebuilds the graph and re-runs the layout from scratch.
//!
//! # Architecture
//!
//! ```text
//!  AnalysisResult ──calls──▸ CallGraph ──▸ LayeredLayout ──▸ RenderScene ──▸ renderer
//!                                                                │
//!                                                         last input + scene
//! ```
//!
//! The remembered input only answers "did anything change?"; it is never
//! used to adjust a previous layout incrementally.

use indexmap::IndexMap;
use serde::Serialize;
use smartcode_core::{
    AnalysisResult, CallLabel, Direction, GraphEdge, GraphNode, LayoutPosition, NodeSize,
};

use crate::engine::{LayeredLayout, LayoutError, LayoutOptions};
use crate::graph::CallGraph;

// ---------------------------------------------------------------
// Error types
// ---------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Layout engine error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Scene serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------
// Scene
// ---------------------------------------------------------------

/// Everything the renderer needs. Styling, pan/zoom and user drags are
/// the renderer's business; it may override any position.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RenderScene {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub positions: IndexMap<String, LayoutPosition>,
    pub node_size: NodeSize,
}

impl RenderScene {
    pub fn build(calls: &[CallLabel], options: LayoutOptions) -> Result<Self, LayoutError> {
        let graph = CallGraph::from_calls(calls);
        let layout = LayeredLayout::new(options).compute_graph(&graph)?;
        Ok(Self {
            nodes: graph.nodes,
            edges: graph.edges,
            positions: layout.positions,
            node_size: options.node_size,
        })
    }

    /// Compact JSON, one line.
    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ---------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------

/// Recompute-on-change wrapper around [`RenderScene::build`].
pub struct DiagramBridge {
    options: LayoutOptions,

    /// Input the current scene was derived from.
    last_input: Option<(Vec<CallLabel>, Direction)>,

    scene: RenderScene,

    /// Running count of full recomputations.
    recomputes: u64,
}

impl Default for DiagramBridge {
    fn default() -> Self {
        Self::new(LayoutOptions::default())
    }
}

impl DiagramBridge {
    pub fn new(options: LayoutOptions) -> Self {
        Self {
            options,
            last_input: None,
            scene: RenderScene {
                node_size: options.node_size,
                ..RenderScene::default()
            },
            recomputes: 0,
        }
    }

    /// One-shot scene for an analysis result.
    pub fn scene_for(
        analysis: &AnalysisResult,
        direction: Direction,
    ) -> Result<RenderScene, BridgeError> {
        let options = LayoutOptions::default().with_direction(direction);
        Ok(RenderScene::build(analysis.calls(), options)?)
    }

    /// Rebuild the scene if `calls` or `direction` differ from the last
    /// successful input. Returns `true` when a recomputation happened.
    ///
    /// On error the previous scene is kept and the input is not
    /// remembered, so the next call retries.
    pub fn update(
        &mut self,
        calls: &[CallLabel],
        direction: Direction,
    ) -> Result<bool, BridgeError> {
        if let Some((prev_calls, prev_dir)) = &self.last_input {
            if *prev_dir == direction && prev_calls.as_slice() == calls {
                return Ok(false);
            }
        }

        let options = self.options.with_direction(direction);
        let scene = RenderScene::build(calls, options)?;

        self.scene = scene;
        self.last_input = Some((calls.to_vec(), direction));
        self.recomputes += 1;
        log::debug!(
            "Bridge: recomputed scene #{} ({} nodes, {direction})",
            self.recomputes,
            self.scene.nodes.len()
        );
        Ok(true)
    }

    pub fn update_from(
        &mut self,
        analysis: &AnalysisResult,
        direction: Direction,
    ) -> Result<bool, BridgeError> {
        self.update(analysis.calls(), direction)
    }

    #[inline]
    pub fn scene(&self) -> &RenderScene {
        &self.scene
    }

    #[inline]
    pub fn total_recomputes(&self) -> u64 {
        self.recomputes
    }
}

// ===================================================================
// Tests
// ===================================================================
