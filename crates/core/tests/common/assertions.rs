//! Custom assertion helpers for event sequences.

use sf_protocol::events::WorkflowEvent;

/// Names of the events, in order.
#[allow(dead_code)]
pub fn event_names(events: &[WorkflowEvent]) -> Vec<&'static str> {
    events.iter().map(WorkflowEvent::name).collect()
}

/// Names of the events that concern `step_id`, in order.
#[allow(dead_code)]
pub fn step_event_names(events: &[WorkflowEvent], step_id: &str) -> Vec<&'static str> {
    events
        .iter()
        .filter(|e| e.step_id() == Some(step_id))
        .map(WorkflowEvent::name)
        .collect()
}

/// Assert that every step event sits between a `step_start` and the step's
/// terminal event, and that the run ends with `workflow_done` or `error`.
#[allow(dead_code)]
pub fn assert_event_sequence(events: &[WorkflowEvent]) {
    assert!(!events.is_empty(), "Event sequence is empty");

    let mut running: Option<&str> = None;
    for event in events {
        match event {
            WorkflowEvent::StepStart(e) => {
                assert!(running.is_none(), "step_start while {running:?} is running");
                running = Some(&e.step_id);
            }
            WorkflowEvent::StepStream(_)
            | WorkflowEvent::StepToolCall(_)
            | WorkflowEvent::StepToolResult(_) => {
                assert_eq!(running, event.step_id(), "event outside its step: {event:?}");
            }
            WorkflowEvent::StepDone(_) | WorkflowEvent::StepError(_) => {
                assert_eq!(running, event.step_id(), "terminal event outside its step");
                running = None;
            }
            WorkflowEvent::StepSkip(_) => {
                assert!(running.is_none(), "step_skip while {running:?} is running");
            }
            WorkflowEvent::WorkflowDone(_) | WorkflowEvent::Error(_) => {}
        }
    }

    let last = events.last().map(WorkflowEvent::name);
    assert!(
        matches!(last, Some("workflow_done" | "error")),
        "Last event should be workflow_done or error, got: {last:?}"
    );
}

/// Drain a receiver whose senders are gone.
#[allow(dead_code)]
pub async fn drain(rx: &mut tokio::sync::mpsc::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
