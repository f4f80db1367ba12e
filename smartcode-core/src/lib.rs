use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

pub mod analysis;

pub use analysis::{AnalysisError, AnalysisResult, Metrics, ProgramFlow};

/// One call site, in program-flow order.
pub type CallLabel = String;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: CallLabel,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<CallLabel>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Top-left corner of a node box.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct LayoutPosition {
    pub x: f32,
    pub y: f32,
}

impl LayoutPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
}

impl NodeSize {
    pub const DEFAULT_WIDTH: f32 = 170.0;
    pub const DEFAULT_HEIGHT: f32 = 48.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for NodeSize {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Axis-aligned drawing bounds.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Rank direction of a layered drawing.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "TB")]
    TopToBottom,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::LeftToRight => "LR",
            Direction::TopToBottom => "TB",
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(pub String);

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction '{}', expected LR or TB", self.0)
    }
}

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LR" => Ok(Direction::LeftToRight),
            "TB" | "TD" => Ok(Direction::TopToBottom),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}
