//! Analyzer result shape consumed by the dashboard.
//!
//! Only `programFlow` drives the diagram. The metrics block is carried
//! through for summary display; any other field the analyzer adds is
//! ignored.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::CallLabel;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid analysis result: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramFlow {
    #[serde(default)]
    pub calls: Vec<CallLabel>,
    /// Informational only; the layout never reads it.
    #[serde(default)]
    pub depth: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub total_lines: u64,
    pub total_classes: u64,
    pub total_methods: u64,
    pub total_variables: u64,
    pub total_conditionals: u64,
    pub total_loops: u64,
    pub exception_handling_count: u64,
    pub cyclomatic_complexity: u64,
    pub code_quality_score: f64,
    pub overall_complexity: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub program_flow: ProgramFlow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

impl AnalysisResult {
    pub fn from_json(input: &str) -> Result<Self, AnalysisError> {
        let result: AnalysisResult = serde_json::from_str(input)?;
        log::debug!(
            "Analysis result: {} calls, depth {}",
            result.program_flow.calls.len(),
            result.program_flow.depth
        );
        Ok(result)
    }

    pub fn calls(&self) -> &[CallLabel] {
        &self.program_flow.calls
    }
}
