//! Test-result events carried on the push channel.
//!
//! Wire format (one SSE frame per result):
//! ```text
//! event: test-update
//! data: {"testName": "loginTest", "status": "PASS", "message": "ok"}
//! ```
//!
//! Validation is structural: `testName` and `status` must be present
//! strings and `status` must be `PASS` or `FAIL`. `message` is optional.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::sse::SseFrame;

/// Event name the test runner publishes results under.
pub const TEST_UPDATE_EVENT: &str = "test-update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl TestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEvent {
    pub test_name: String,
    pub status: TestStatus,
    pub message: String,
}

/// Why a frame was dropped. Never surfaced past the consumer.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Payload is not a JSON object")]
    NotAnObject,
    #[error("Missing or non-string field '{0}'")]
    MissingField(&'static str),
    #[error("Unknown status '{0}'")]
    UnknownStatus(String),
}

impl TestEvent {
    pub fn new(
        test_name: impl Into<String>,
        status: TestStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            status,
            message: message.into(),
        }
    }

    pub fn pass(test_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_name, TestStatus::Pass, message)
    }

    pub fn fail(test_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(test_name, TestStatus::Fail, message)
    }

    /// Parse and validate one frame payload.
    pub fn from_json(data: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(data)?;
        let object = value.as_object().ok_or(FrameError::NotAnObject)?;

        let test_name = object
            .get("testName")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingField("testName"))?;
        let status = match object.get("status").and_then(Value::as_str) {
            Some("PASS") => TestStatus::Pass,
            Some("FAIL") => TestStatus::Fail,
            Some(other) => return Err(FrameError::UnknownStatus(other.to_string())),
            None => return Err(FrameError::MissingField("status")),
        };
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Self::new(test_name, status, message))
    }

    pub fn is_pass(&self) -> bool {
        self.status == TestStatus::Pass
    }

    /// Encode as one event-stream frame under `event_name`.
    pub fn to_frame(&self, event_name: &str) -> String {
        let data = serde_json::to_string(self).unwrap_or_default();
        format!("event: {event_name}\ndata: {data}\n\n")
    }
}

/// Outcome of classifying one decoded frame.
#[derive(Debug)]
pub enum Inbound {
    Event(TestEvent),
    /// Frame for a different event name.
    Ignored,
    Malformed(FrameError),
}

pub fn classify(frame: &SseFrame, event_name: &str) -> Inbound {
    if frame.event != event_name {
        return Inbound::Ignored;
    }
    match TestEvent::from_json(&frame.data) {
        Ok(event) => Inbound::Event(event),
        Err(e) => Inbound::Malformed(e),
    }
}
