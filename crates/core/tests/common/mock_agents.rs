//! Scripted agent runtimes and raw wire bodies.

use sf_core::agents::{AgentEvent, MockAgentRuntime};
use sf_core::sse::encode::{done_line, encode_event};
use sf_protocol::events::WorkflowEvent;

/// Runtime for `review_workflow`: the writer streams "Hel" + "lo", and the
/// critic answers `verdict`.
#[allow(dead_code)]
pub fn review_runtime(verdict: &str) -> MockAgentRuntime {
    MockAgentRuntime::new()
        .with_output("writer", &["Hel", "lo"])
        .with_output("critic", &[verdict])
        .with_output("publisher", &["published"])
}

/// A ReAct style script: one tool round trip, then an answer.
#[allow(dead_code)]
pub fn tool_using_script(answer: &str) -> Vec<Result<AgentEvent, sf_core::agents::AgentError>> {
    vec![
        Ok(AgentEvent::ToolCall {
            tool: "search".to_string(),
            args: serde_json::json!({"q": "rust"}),
            call_id: Some("call-1".to_string()),
        }),
        Ok(AgentEvent::ToolResult {
            tool: "search".to_string(),
            result: "3 hits".to_string(),
            call_id: Some("call-1".to_string()),
        }),
        Ok(AgentEvent::Stream(answer.to_string())),
        Ok(AgentEvent::Completed { output: None }),
    ]
}

/// Render events as a complete response body, `[DONE]` included.
#[allow(dead_code)]
pub fn wire_body(events: &[WorkflowEvent]) -> Vec<u8> {
    let mut body = String::new();
    for event in events {
        body.push_str(&encode_event(event).expect("event should serialize"));
    }
    body.push_str(&done_line());
    body.into_bytes()
}

/// Split `body` into chunks of at most `size` bytes.
#[allow(dead_code)]
pub fn chunked(body: &[u8], size: usize) -> Vec<Result<Vec<u8>, String>> {
    body.chunks(size).map(|c| Ok(c.to_vec())).collect()
}
