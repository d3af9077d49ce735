//! Run-level state tracking.

use crate::dispatch::WorkflowEventHandler;
use crate::state::step::{
    append_output, attach_tool_result, complete_step, fail_step, record_tool_call, skip_step,
    start_step, TransitionError,
};
use crate::workflow::Workflow;
use sf_protocol::events::{
    RunError, StepDone, StepError, StepSkip, StepStart, StepStream, StepToolCall, StepToolResult,
    WorkflowDone,
};
use sf_protocol::run_models::{RunState, StepRunState};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A fresh run state with every step of the workflow pending.
pub fn new_run_state(workflow: &Workflow) -> RunState {
    RunState {
        steps: workflow
            .steps
            .iter()
            .map(|step| (step.id.clone(), StepRunState::default()))
            .collect(),
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCompletion {
    /// `workflow_done` was reached.
    Finished {
        step_outputs: BTreeMap<String, String>,
    },
    /// The run was cancelled. Steps that were in flight stay `running`.
    Cancelled,
}

/// Final state of a run that was not aborted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub state: RunState,
    pub completion: RunCompletion,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.completion, RunCompletion::Cancelled)
    }

    /// The `workflow_done` outputs, when the run finished.
    pub fn step_outputs(&self) -> Option<&BTreeMap<String, String>> {
        match &self.completion {
            RunCompletion::Finished { step_outputs } => Some(step_outputs),
            RunCompletion::Cancelled => None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepRunState> {
        self.state.steps.get(step_id)
    }
}

/// Applies workflow events to a `RunState`.
///
/// Events that would break the step state machine are logged and dropped;
/// they never corrupt the state.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    state: RunState,
    step_outputs: Option<BTreeMap<String, String>>,
    error: Option<String>,
}

impl RunTracker {
    pub fn new(workflow: &Workflow) -> Self {
        Self {
            state: new_run_state(workflow),
            ..Default::default()
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn step(&self, step_id: &str) -> Option<&StepRunState> {
        self.state.steps.get(step_id)
    }

    /// Outputs reported by `workflow_done`, if it was received.
    pub fn step_outputs(&self) -> Option<&BTreeMap<String, String>> {
        self.step_outputs.as_ref()
    }

    /// Message of a top-level `error`, if one was received.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_outcome(self, completion: RunCompletion) -> RunOutcome {
        RunOutcome {
            state: self.state,
            completion,
        }
    }

    fn apply<F>(&mut self, event: &'static str, step_id: &str, transition: F)
    where
        F: FnOnce(&mut StepRunState) -> Result<(), TransitionError>,
    {
        // Steps the server knows about but the local definition does not are
        // tracked too.
        let step = self.state.steps.entry(step_id.to_string()).or_default();
        if let Err(e) = transition(step) {
            warn!(event, step_id, error = %e, "rejected step transition");
        }
    }
}

impl WorkflowEventHandler for RunTracker {
    fn on_step_start(&mut self, event: &StepStart) {
        info!(step_id = %event.step_id, index = event.index, agent = %event.agent_name, "step started");
        self.apply("step_start", &event.step_id, start_step);
    }

    fn on_step_stream(&mut self, event: &StepStream) {
        self.apply("step_stream", &event.step_id, |step| {
            append_output(step, &event.content)
        });
    }

    fn on_step_done(&mut self, event: &StepDone) {
        info!(step_id = %event.step_id, length = event.output_length, "step done");
        self.apply("step_done", &event.step_id, |step| {
            complete_step(step, &event.output_preview)
        });
    }

    fn on_step_error(&mut self, event: &StepError) {
        info!(step_id = %event.step_id, error = %event.error, "step failed");
        self.apply("step_error", &event.step_id, |step| fail_step(step, &event.error));
    }

    fn on_step_skip(&mut self, event: &StepSkip) {
        info!(step_id = %event.step_id, "step skipped");
        self.apply("step_skip", &event.step_id, |step| {
            skip_step(step, event.default_output.as_deref())
        });
    }

    fn on_step_tool_call(&mut self, event: &StepToolCall) {
        debug!(step_id = %event.step_id, tool = %event.tool, "tool call");
        self.apply("step_tool_call", &event.step_id, |step| {
            record_tool_call(step, &event.tool, event.args.clone(), event.call_id.clone())
        });
    }

    fn on_step_tool_result(&mut self, event: &StepToolResult) {
        debug!(step_id = %event.step_id, tool = %event.tool, "tool result");
        self.apply("step_tool_result", &event.step_id, |step| {
            attach_tool_result(step, &event.tool, &event.result, event.call_id.as_deref())
        });
    }

    fn on_workflow_done(&mut self, event: &WorkflowDone) {
        info!(total_steps = event.total_steps, "workflow done");
        self.step_outputs = Some(event.step_outputs.clone());
    }

    fn on_error(&mut self, event: &RunError) {
        warn!(message = %event.message, "run aborted");
        self.error = Some(event.message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{dispatch, DispatchOutcome};
    use serde_json::json;
    use sf_protocol::events::WorkflowEvent;
    use sf_protocol::run_models::StepStatus;
    use sf_protocol::workflow_models::{StepDefinition, WorkflowDefinition};

    fn workflow() -> Workflow {
        let step = |id: &str| StepDefinition {
            id: id.to_string(),
            agent_id: "agent".to_string(),
            agent_name: "Agent".to_string(),
            variable_mappings: Default::default(),
            condition: None,
            default_output: None,
        };
        Workflow::from_definition(WorkflowDefinition {
            id: "wf".to_string(),
            name: "tracker".to_string(),
            description: String::new(),
            steps: vec![step("a"), step("b")],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        })
        .unwrap()
    }

    fn start(step_id: &str, index: usize) -> WorkflowEvent {
        WorkflowEvent::StepStart(StepStart {
            step_id: step_id.to_string(),
            index,
            agent_name: "Agent".to_string(),
            agent_id: "agent".to_string(),
        })
    }

    fn stream(step_id: &str, content: &str) -> WorkflowEvent {
        WorkflowEvent::StepStream(StepStream {
            step_id: step_id.to_string(),
            index: 0,
            content: content.to_string(),
        })
    }

    #[test]
    fn test_new_run_state_seeds_pending_steps() {
        let state = new_run_state(&workflow());
        assert_eq!(state.steps.len(), 2);
        assert!(state.steps.values().all(|s| s.status == StepStatus::Pending));
    }

    #[test]
    fn test_tracker_applies_events() {
        let mut tracker = RunTracker::new(&workflow());

        for event in [
            start("a", 0),
            stream("a", "Hel"),
            stream("a", "lo"),
            WorkflowEvent::StepDone(StepDone {
                step_id: "a".to_string(),
                index: 0,
                output_preview: "Hello".to_string(),
                output_length: 5,
            }),
            WorkflowEvent::StepSkip(StepSkip {
                step_id: "b".to_string(),
                default_output: Some("none".to_string()),
            }),
        ] {
            assert_eq!(dispatch(&mut tracker, &event), DispatchOutcome::Continue);
        }

        let outcome = dispatch(
            &mut tracker,
            &WorkflowEvent::WorkflowDone(WorkflowDone {
                total_steps: 2,
                step_outputs: BTreeMap::from([
                    ("a".to_string(), "Hello".to_string()),
                    ("b".to_string(), "none".to_string()),
                ]),
            }),
        );

        assert_eq!(outcome, DispatchOutcome::Finished);
        assert_eq!(tracker.step("a").unwrap().output, "Hello");
        assert_eq!(tracker.step("a").unwrap().status, StepStatus::Done);
        assert_eq!(tracker.step("b").unwrap().status, StepStatus::Skipped);
        assert_eq!(tracker.step("b").unwrap().output, "none");
        assert_eq!(tracker.step_outputs().unwrap()["a"], "Hello");
    }

    #[test]
    fn test_tracker_tool_calls_and_errors() {
        let mut tracker = RunTracker::new(&workflow());

        dispatch(&mut tracker, &start("a", 0));
        dispatch(
            &mut tracker,
            &WorkflowEvent::StepToolCall(StepToolCall {
                step_id: "a".to_string(),
                step_index: 0,
                tool: "search".to_string(),
                args: json!({"q": "rust"}),
                call_id: Some("c1".to_string()),
            }),
        );
        dispatch(
            &mut tracker,
            &WorkflowEvent::StepToolResult(StepToolResult {
                step_id: "a".to_string(),
                step_index: 0,
                tool: "search".to_string(),
                result: "found".to_string(),
                call_id: None,
            }),
        );
        dispatch(
            &mut tracker,
            &WorkflowEvent::StepError(StepError {
                step_id: "a".to_string(),
                index: 0,
                error: "boom".to_string(),
            }),
        );

        let a = tracker.step("a").unwrap();
        assert_eq!(a.status, StepStatus::Error);
        assert_eq!(a.error.as_deref(), Some("boom"));
        assert_eq!(a.tool_calls[0].result.as_deref(), Some("found"));
        assert!(tracker.error().is_none());
    }

    #[test]
    fn test_tracker_ignores_invalid_transitions() {
        let mut tracker = RunTracker::new(&workflow());

        // Stream before start
        dispatch(&mut tracker, &stream("a", "early"));
        assert_eq!(tracker.step("a").unwrap().output, "");
        assert_eq!(tracker.step("a").unwrap().status, StepStatus::Pending);
    }

    #[test]
    fn test_tracker_records_top_level_error() {
        let mut tracker = RunTracker::new(&workflow());
        let outcome = dispatch(
            &mut tracker,
            &WorkflowEvent::Error(RunError {
                message: "server exploded".to_string(),
            }),
        );

        assert_eq!(outcome, DispatchOutcome::Aborted("server exploded".to_string()));
        assert_eq!(tracker.error(), Some("server exploded"));
    }
}
