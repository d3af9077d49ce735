//! Agent runtime sub-protocol.
//!
//! When a step executes, its bound agent is invoked with
//! `POST /agents/{agentId}/run` and answers with the same SSE framing as a
//! workflow run, using the event names defined here. A simple completion
//! emits `stream` chunks and `done`; a ReAct agent interleaves `tool_call` and
//! `tool_result` frames between them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Body of `POST /agents/{agentId}/run`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct AgentRunRequest {
    /// Id of the workflow step this invocation runs for.
    pub step_id: String,

    /// Resolved step inputs, one per variable mapping.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct AgentChunk {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct AgentToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default)]
    pub call_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct AgentToolResult {
    pub tool: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub call_id: Option<String>,
}

/// Terminal success frame. `output` is the agent's own view of its final
/// answer and is only used when nothing was streamed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct AgentDone {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct AgentFailure {
    pub message: String,
}

/// Frames an agent runtime may stream for one step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    #[serde(alias = "token")]
    Stream(AgentChunk),
    ToolCall(AgentToolCall),
    ToolResult(AgentToolResult),
    Done(AgentDone),
    Error(AgentFailure),
}

impl AgentStreamEvent {
    /// Every event name of the sub-protocol, aliases included.
    pub const NAMES: &'static [&'static str] =
        &["stream", "token", "tool_call", "tool_result", "done", "error"];

    pub fn is_known_name(name: &str) -> bool {
        Self::NAMES.contains(&name)
    }
}
