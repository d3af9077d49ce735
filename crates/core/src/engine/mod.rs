//! Pipeline execution engine.
//!
//! The PipelineController runs a workflow's steps strictly in order. For each
//! step it evaluates the condition, resolves the variable mappings against the
//! latest run state and streams the agent's answer into the step state
//! machine. Every state change is published as a `WorkflowEvent`, in the same
//! vocabulary a remote workflow server uses.

use crate::agents::base::{AgentError, AgentEvent, AgentRequest, AgentRuntime};
use crate::condition::should_execute;
use crate::dispatch::dispatch;
use crate::inputs::RuntimeInputs;
use crate::resolver::Resolver;
use crate::state::run::{RunCompletion, RunOutcome, RunTracker};
use crate::workflow::{Step, Workflow};
use sf_protocol::config_models::DEFAULT_PREVIEW_CHARS;
use sf_protocol::events::{
    RunError, StepDone, StepError, StepSkip, StepStart, StepStream, StepToolCall, StepToolResult,
    WorkflowDone, WorkflowEvent,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const INCOMPLETE_STREAM_ERROR: &str = "agent stream ended without completing";

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The agent runtime failed; the run was aborted at this step.
    #[error("step '{step_id}': {source}")]
    Agent {
        step_id: String,
        #[source]
        source: AgentError,
    },
}

/// Cancel `token` once `after` has elapsed, unless it was cancelled first.
pub fn cancel_after(token: CancellationToken, after: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(after) => {
                debug!(?after, "run timed out");
                token.cancel();
            }
        }
    })
}

/// How a single step ended.
enum StepEnd {
    Settled,
    Cancelled,
}

/// The main pipeline execution engine.
pub struct PipelineController {
    runtime: Arc<dyn AgentRuntime>,
    preview_chars: usize,
}

impl PipelineController {
    /// Create a new PipelineController on top of an agent runtime.
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Number of characters carried in `step_done.output_preview`.
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Execute a workflow and return its final run state.
    ///
    /// # Arguments
    ///
    /// * `workflow` - The workflow to execute
    /// * `inputs` - Runtime inputs, collected before the run
    /// * `events_tx` - Channel receiving every emitted event, in order
    /// * `cancel` - Cancelling it stops the run at the next await point
    ///
    /// # Returns
    ///
    /// The final run state, either finished or cancelled. A cancelled run
    /// keeps the in-flight step `running` and emits nothing further.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Agent` when the agent runtime fails. An `error`
    /// event is emitted first and no further steps run.
    pub async fn run(
        &self,
        workflow: &Workflow,
        inputs: &RuntimeInputs,
        events_tx: Sender<WorkflowEvent>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow_run", workflow_id = %workflow.id, %run_id);

        async move {
            info!(steps = workflow.steps.len(), "run started");
            let mut run = Run {
                tracker: RunTracker::new(workflow),
                events_tx: &events_tx,
                cancel: &cancel,
            };

            for (index, step) in workflow.steps.iter().enumerate() {
                if cancel.is_cancelled() {
                    return Ok(run.cancelled());
                }

                match self.run_step(&mut run, workflow, inputs, index, step, &cancel).await? {
                    StepEnd::Settled => {}
                    StepEnd::Cancelled => return Ok(run.cancelled()),
                }
            }

            let step_outputs: BTreeMap<String, String> = workflow
                .steps
                .iter()
                .map(|step| {
                    let output = run
                        .tracker
                        .step(&step.id)
                        .map(|s| s.output.clone())
                        .unwrap_or_default();
                    (step.id.clone(), output)
                })
                .collect();

            run.emit(WorkflowEvent::WorkflowDone(WorkflowDone {
                total_steps: workflow.steps.len(),
                step_outputs: step_outputs.clone(),
            }))
            .await;

            info!("run finished");
            Ok(run.tracker.into_outcome(RunCompletion::Finished { step_outputs }))
        }
        .instrument(span)
        .await
    }

    async fn run_step(
        &self,
        run: &mut Run<'_>,
        workflow: &Workflow,
        inputs: &RuntimeInputs,
        index: usize,
        step: &Step,
        cancel: &CancellationToken,
    ) -> Result<StepEnd, PipelineError> {
        let resolver = Resolver::new(workflow, run.tracker.state(), inputs, index);
        if !should_execute(step.condition.as_ref(), &resolver) {
            debug!(step_id = %step.id, "condition not met");
            run.emit(WorkflowEvent::StepSkip(StepSkip {
                step_id: step.id.clone(),
                default_output: step.default_output.clone(),
            }))
            .await;
            return Ok(StepEnd::Settled);
        }
        let variables = resolver.resolve_all(&step.variable_mappings);

        run.emit(WorkflowEvent::StepStart(StepStart {
            step_id: step.id.clone(),
            index,
            agent_name: step.agent_name.clone(),
            agent_id: step.agent_id.clone(),
        }))
        .await;

        let request = AgentRequest {
            agent_id: step.agent_id.clone(),
            agent_name: step.agent_name.clone(),
            step_id: step.id.clone(),
            variables,
        };

        let invoked = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StepEnd::Cancelled),
            invoked = self.runtime.execute(&request) => invoked,
        };
        let mut stream = match invoked {
            Ok(stream) => stream,
            Err(source) => return Err(run.abort(step, source).await),
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StepEnd::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(AgentEvent::Stream(content))) => {
                    run.emit(WorkflowEvent::StepStream(StepStream {
                        step_id: step.id.clone(),
                        index,
                        content,
                    }))
                    .await;
                }
                Some(Ok(AgentEvent::ToolCall {
                    tool,
                    args,
                    call_id,
                })) => {
                    run.emit(WorkflowEvent::StepToolCall(StepToolCall {
                        step_id: step.id.clone(),
                        step_index: index,
                        tool,
                        args,
                        call_id,
                    }))
                    .await;
                }
                Some(Ok(AgentEvent::ToolResult {
                    tool,
                    result,
                    call_id,
                })) => {
                    run.emit(WorkflowEvent::StepToolResult(StepToolResult {
                        step_id: step.id.clone(),
                        step_index: index,
                        tool,
                        result,
                        call_id,
                    }))
                    .await;
                }
                Some(Ok(AgentEvent::Completed { output })) => {
                    let streamed = run.output_of(&step.id);
                    if let Some(output) = output.filter(|o| !o.is_empty()) {
                        if streamed.is_empty() {
                            run.emit(WorkflowEvent::StepStream(StepStream {
                                step_id: step.id.clone(),
                                index,
                                content: output,
                            }))
                            .await;
                        }
                    }

                    let output = run.output_of(&step.id);
                    run.emit(WorkflowEvent::StepDone(StepDone {
                        step_id: step.id.clone(),
                        index,
                        output_preview: output.chars().take(self.preview_chars).collect(),
                        output_length: output.chars().count(),
                    }))
                    .await;
                    return Ok(StepEnd::Settled);
                }
                Some(Ok(AgentEvent::Failed(error))) => {
                    run.emit(WorkflowEvent::StepError(StepError {
                        step_id: step.id.clone(),
                        index,
                        error,
                    }))
                    .await;
                    return Ok(StepEnd::Settled);
                }
                Some(Err(source)) => return Err(run.abort(step, source).await),
                None => {
                    warn!(step_id = %step.id, "{INCOMPLETE_STREAM_ERROR}");
                    run.emit(WorkflowEvent::StepError(StepError {
                        step_id: step.id.clone(),
                        index,
                        error: INCOMPLETE_STREAM_ERROR.to_string(),
                    }))
                    .await;
                    return Ok(StepEnd::Settled);
                }
            }
        }
    }
}

/// Per-invocation state. Each event is applied to the tracker before it is
/// published, so observers and the resolver see the same transitions.
/// A full channel never outlasts cancellation.
struct Run<'a> {
    tracker: RunTracker,
    events_tx: &'a Sender<WorkflowEvent>,
    cancel: &'a CancellationToken,
}

impl Run<'_> {
    async fn emit(&mut self, event: WorkflowEvent) {
        dispatch(&mut self.tracker, &event);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = self.events_tx.send(event) => {}
        }
    }

    fn output_of(&self, step_id: &str) -> String {
        self.tracker
            .step(step_id)
            .map(|s| s.output.clone())
            .unwrap_or_default()
    }

    async fn abort(&mut self, step: &Step, source: AgentError) -> PipelineError {
        warn!(step_id = %step.id, error = %source, "agent runtime failed, aborting run");
        self.emit(WorkflowEvent::Error(RunError {
            message: format!("step '{}': {source}", step.id),
        }))
        .await;
        PipelineError::Agent {
            step_id: step.id.clone(),
            source,
        }
    }

    fn cancelled(self) -> RunOutcome {
        info!("run cancelled");
        self.tracker.into_outcome(RunCompletion::Cancelled)
    }
}
