//! Event dispatch.
//!
//! Frames are decoded against a fixed vocabulary and routed to one handler
//! method per event name. Unknown names are ignored so that newer servers can
//! add events without breaking older clients. Dispatch is synchronous and
//! preserves arrival order.

use crate::sse::Frame;
use serde::de::DeserializeOwned;
use sf_protocol::events::{
    RunError, StepDone, StepError, StepSkip, StepStart, StepStream, StepToolCall, StepToolResult,
    WorkflowDone, WorkflowEvent,
};
use tracing::debug;

/// Decode a frame into a typed event vocabulary.
///
/// Returns `None` for unknown event names and for payloads that do not match
/// the event's shape.
pub fn decode_frame<E: DeserializeOwned>(frame: &Frame) -> Option<E> {
    let tagged = serde_json::json!({
        "event": frame.event,
        "data": frame.data,
    });

    match serde_json::from_value(tagged) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!(event = %frame.event, error = %e, "ignoring frame");
            None
        }
    }
}

/// Receives workflow events. Every method defaults to doing nothing.
pub trait WorkflowEventHandler {
    fn on_step_start(&mut self, _event: &StepStart) {}
    fn on_step_stream(&mut self, _event: &StepStream) {}
    fn on_step_done(&mut self, _event: &StepDone) {}
    fn on_step_error(&mut self, _event: &StepError) {}
    fn on_step_skip(&mut self, _event: &StepSkip) {}
    fn on_step_tool_call(&mut self, _event: &StepToolCall) {}
    fn on_step_tool_result(&mut self, _event: &StepToolResult) {}
    fn on_workflow_done(&mut self, _event: &WorkflowDone) {}
    fn on_error(&mut self, _event: &RunError) {}
}

/// What the read loop should do after an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Continue,
    /// `workflow_done` was received.
    Finished,
    /// A top-level `error` was received; the run is over.
    Aborted(String),
}

/// Route one event to its handler method.
pub fn dispatch<H: WorkflowEventHandler + ?Sized>(
    handler: &mut H,
    event: &WorkflowEvent,
) -> DispatchOutcome {
    match event {
        WorkflowEvent::StepStart(e) => handler.on_step_start(e),
        WorkflowEvent::StepStream(e) => handler.on_step_stream(e),
        WorkflowEvent::StepDone(e) => handler.on_step_done(e),
        WorkflowEvent::StepError(e) => handler.on_step_error(e),
        WorkflowEvent::StepSkip(e) => handler.on_step_skip(e),
        WorkflowEvent::StepToolCall(e) => handler.on_step_tool_call(e),
        WorkflowEvent::StepToolResult(e) => handler.on_step_tool_result(e),
        WorkflowEvent::WorkflowDone(e) => {
            handler.on_workflow_done(e);
            return DispatchOutcome::Finished;
        }
        WorkflowEvent::Error(e) => {
            handler.on_error(e);
            return DispatchOutcome::Aborted(e.message.clone());
        }
    }
    DispatchOutcome::Continue
}

/// Decode and dispatch a raw frame. `None` when the frame was ignored.
pub fn dispatch_frame<H: WorkflowEventHandler + ?Sized>(
    handler: &mut H,
    frame: &Frame,
) -> Option<(WorkflowEvent, DispatchOutcome)> {
    let event: WorkflowEvent = decode_frame(frame)?;
    let outcome = dispatch(handler, &event);
    Some((event, outcome))
}
