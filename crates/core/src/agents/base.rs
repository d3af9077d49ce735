//! Agent runtime trait and supporting types.

use async_trait::async_trait;
use serde_json::Value;
use sf_protocol::agent_models::AgentStreamEvent;
use std::collections::BTreeMap;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// One execution request for the agent bound to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub agent_id: String,
    pub agent_name: String,
    pub step_id: String,
    /// Resolved variable mappings of the step.
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Stream(String),
    ToolCall {
        tool: String,
        args: Value,
        call_id: Option<String>,
    },
    ToolResult {
        tool: String,
        result: String,
        call_id: Option<String>,
    },
    /// The agent finished. `output` is set when the runtime reports the full
    /// output in the terminal event instead of streaming it.
    Completed { output: Option<String> },
    /// The agent ran but the step failed.
    Failed(String),
}

impl From<AgentStreamEvent> for AgentEvent {
    fn from(event: AgentStreamEvent) -> Self {
        match event {
            AgentStreamEvent::Stream(chunk) => AgentEvent::Stream(chunk.content),
            AgentStreamEvent::ToolCall(call) => AgentEvent::ToolCall {
                tool: call.tool,
                args: call.args,
                call_id: call.call_id,
            },
            AgentStreamEvent::ToolResult(result) => AgentEvent::ToolResult {
                tool: result.tool,
                result: result.result,
                call_id: result.call_id,
            },
            AgentStreamEvent::Done(done) => AgentEvent::Completed {
                output: done.output,
            },
            AgentStreamEvent::Error(failure) => AgentEvent::Failed(failure.message),
        }
    }
}

/// Failures of the runtime itself, as opposed to a step that ran and failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Agent runtime answered {status}: {body}")]
    Status { status: u16, body: String },
    /// A known agent event arrived with a payload of the wrong shape.
    #[error("Stream parsing error: {0}")]
    StreamParseError(String),
}

pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, AgentError>> + Send>>;

/// Executes steps on an external agent runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn execute(&self, request: &AgentRequest) -> Result<AgentEventStream, AgentError>;
}
