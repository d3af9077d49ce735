//! Rendering frames back to SSE wire text.

use super::reader::{Frame, DONE_MARKER};
use sf_protocol::events::WorkflowEvent;

/// Render one frame as `event: <name>\ndata: <json>\n\n`.
pub fn encode_frame(frame: &Frame) -> String {
    format!("event: {}\ndata: {}\n\n", frame.event, frame.data)
}

/// Render a workflow event in wire form.
pub fn encode_event(event: &WorkflowEvent) -> Result<String, serde_json::Error> {
    Ok(encode_frame(&to_frame(event)?))
}

/// Convert a typed workflow event into its untyped frame.
pub fn to_frame(event: &WorkflowEvent) -> Result<Frame, serde_json::Error> {
    let mut value = serde_json::to_value(event)?;
    let data = value
        .get_mut("data")
        .map(serde_json::Value::take)
        .unwrap_or_default();
    Ok(Frame::new(event.name(), data))
}

/// The stream terminator line.
pub fn done_line() -> String {
    format!("data: {DONE_MARKER}\n\n")
}
