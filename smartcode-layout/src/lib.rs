//! # smartcode-layout: call-flow diagram layout
//!
//! - [`graph`]: call sequence → path graph
//! - [`engine`]: layered (rank-based) layout for small DAGs
//! - [`bridge`]: analysis result → render scene, recomputed on input change

pub mod bridge;
pub mod engine;
pub mod graph;

pub use bridge::{BridgeError, DiagramBridge, RenderScene};
pub use engine::{layout, GraphLayout, LayeredLayout, LayoutError, LayoutOptions};
pub use graph::CallGraph;
