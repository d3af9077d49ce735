//! Workflow run event vocabulary.
//!
//! `POST /workflows/{id}/run` answers with a body of SSE frames. Each frame is
//! an `event: <name>` line followed by a `data: <json>` line, and the stream
//! ends with `data: [DONE]`. This module defines the request body and one
//! payload type per event name.
//!
//! `WorkflowEvent` uses adjacent tagging so that a frame maps onto it
//! directly:
//! ```json
//! { "event": "step_stream", "data": { "step_id": "a", "index": 0, "content": "Hel" } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Body of `POST /workflows/{id}/run`.
///
/// `variables` holds exactly the runtime inputs the workflow references.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct RunRequest {
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepStart {
    pub step_id: String,
    pub index: usize,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub agent_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepStream {
    pub step_id: String,
    #[serde(default)]
    pub index: usize,
    pub content: String,
}

/// A step finished. `output_preview` may be truncated; `output_length` is the
/// full output length in characters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepDone {
    pub step_id: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub output_preview: String,
    #[serde(default)]
    pub output_length: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepError {
    pub step_id: String,
    #[serde(default)]
    pub index: usize,
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepSkip {
    pub step_id: String,
    #[serde(default)]
    pub default_output: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StepToolCall {
    pub step_id: String,
    #[serde(default)]
    pub step_index: usize,
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default)]
    pub call_id: Option<String>,
}

/// Result of a tool call. When `call_id` is present the result is matched to
/// the call with the same id, otherwise to the latest unresolved call of the
/// same tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepToolResult {
    pub step_id: String,
    #[serde(default)]
    pub step_index: usize,
    pub tool: String,
    #[serde(default)]
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct WorkflowDone {
    pub total_steps: usize,
    #[serde(default)]
    pub step_outputs: BTreeMap<String, String>,
}

/// Top-level failure. Terminal for the whole run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct RunError {
    pub message: String,
}

/// Every event a workflow run can stream, in wire vocabulary.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepStart(StepStart),
    StepStream(StepStream),
    StepDone(StepDone),
    StepError(StepError),
    StepSkip(StepSkip),
    StepToolCall(StepToolCall),
    StepToolResult(StepToolResult),
    WorkflowDone(WorkflowDone),
    Error(RunError),
}

impl WorkflowEvent {
    /// The `event:` line name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::StepStart(_) => "step_start",
            WorkflowEvent::StepStream(_) => "step_stream",
            WorkflowEvent::StepDone(_) => "step_done",
            WorkflowEvent::StepError(_) => "step_error",
            WorkflowEvent::StepSkip(_) => "step_skip",
            WorkflowEvent::StepToolCall(_) => "step_tool_call",
            WorkflowEvent::StepToolResult(_) => "step_tool_result",
            WorkflowEvent::WorkflowDone(_) => "workflow_done",
            WorkflowEvent::Error(_) => "error",
        }
    }

    /// The step this event belongs to, if any.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            WorkflowEvent::StepStart(e) => Some(&e.step_id),
            WorkflowEvent::StepStream(e) => Some(&e.step_id),
            WorkflowEvent::StepDone(e) => Some(&e.step_id),
            WorkflowEvent::StepError(e) => Some(&e.step_id),
            WorkflowEvent::StepSkip(e) => Some(&e.step_id),
            WorkflowEvent::StepToolCall(e) => Some(&e.step_id),
            WorkflowEvent::StepToolResult(e) => Some(&e.step_id),
            WorkflowEvent::WorkflowDone(_) | WorkflowEvent::Error(_) => None,
        }
    }
}
