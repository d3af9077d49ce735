//! Remote workflow runs.
//!
//! `WorkflowClient` asks a workflow server to run a workflow and follows the
//! resulting event stream: Frame Reader, then Dispatcher, then `RunTracker`.

use crate::dispatch::{dispatch_frame, DispatchOutcome};
use crate::inputs::RuntimeInputs;
use crate::sse::stream::frames;
use crate::state::run::{RunCompletion, RunOutcome, RunTracker};
use crate::workflow::Workflow;
use sf_protocol::config_models::GlobalConfig;
use sf_protocol::events::{RunRequest, WorkflowEvent};
use std::fmt::Display;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("run failed: {0}")]
    Remote(String),

    #[error("event stream ended before the workflow finished")]
    Incomplete,
}

pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl WorkflowClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.server_url.as_str())
    }

    fn run_url(&self, workflow_id: &str) -> String {
        format!("{}/workflows/{}/run", self.base_url, workflow_id)
    }

    /// Run a workflow on the server.
    ///
    /// The request carries exactly the runtime input keys the workflow
    /// references; keys missing from `inputs` are sent empty. Each decoded
    /// event is forwarded to `observer` after it was applied.
    pub async fn run(
        &self,
        workflow: &Workflow,
        inputs: &RuntimeInputs,
        observer: Option<Sender<WorkflowEvent>>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, ClientError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("remote_run", workflow_id = %workflow.id, %run_id);

        async move {
            let variables = workflow
                .runtime_input_keys()
                .into_iter()
                .map(|key| {
                    let value = inputs.get(&key).cloned().unwrap_or_default();
                    (key, value)
                })
                .collect();

            let url = self.run_url(&workflow.id);
            debug!(%url, "starting remote run");
            let send = self.http.post(&url).json(&RunRequest { variables }).send();

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(RunTracker::new(workflow).into_outcome(RunCompletion::Cancelled));
                }
                response = send => response.map_err(|e| ClientError::Transport(e.to_string()))?,
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            consume(workflow, response.bytes_stream(), observer, cancel).await
        }
        .instrument(span)
        .await
    }
}

/// Follow a run's event stream from any chunked byte source.
///
/// Returns once `workflow_done` arrives. A top-level `error` event becomes
/// `ClientError::Remote`; a body that ends first is `ClientError::Incomplete`.
pub async fn consume<S, B, E>(
    workflow: &Workflow,
    body: S,
    observer: Option<Sender<WorkflowEvent>>,
    cancel: CancellationToken,
) -> Result<RunOutcome, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut tracker = RunTracker::new(workflow);
    let frames = frames(body);
    tokio::pin!(frames);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(tracker.into_outcome(RunCompletion::Cancelled)),
            next = frames.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(ClientError::Transport(e.to_string())),
            None => return Err(ClientError::Incomplete),
        };

        let Some((event, outcome)) = dispatch_frame(&mut tracker, &frame) else {
            continue;
        };

        if let Some(observer) = &observer {
            let _ = observer.send(event).await;
        }

        match outcome {
            DispatchOutcome::Continue => {}
            DispatchOutcome::Finished => {
                let step_outputs = tracker.step_outputs().cloned().unwrap_or_default();
                return Ok(tracker.into_outcome(RunCompletion::Finished { step_outputs }));
            }
            DispatchOutcome::Aborted(message) => return Err(ClientError::Remote(message)),
        }
    }
}
