//! Agent runtime reached over HTTP.
//!
//! Each step is one `POST {base}/agents/{agentId}/run` whose response body is
//! a stream of SSE frames in the agent sub-protocol.

use crate::agents::base::{AgentError, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime};
use crate::dispatch::decode_frame;
use crate::sse::stream::frames;
use async_trait::async_trait;
use sf_protocol::agent_models::{AgentRunRequest, AgentStreamEvent};
use sf_protocol::config_models::GlobalConfig;
use tokio_stream::StreamExt;
use tracing::debug;

pub struct HttpAgentRuntime {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAgentRuntime {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a runtime for the configured server.
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.server_url.as_str())
    }

    fn run_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{}/run", self.base_url, agent_id)
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    async fn execute(&self, request: &AgentRequest) -> Result<AgentEventStream, AgentError> {
        let url = self.run_url(&request.agent_id);
        debug!(%url, step_id = %request.step_id, "invoking agent");

        let body = AgentRunRequest {
            step_id: request.step_id.clone(),
            variables: request.variables.clone(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AgentError::NotAvailable(request.agent_id.clone()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let stream = async_stream::stream! {
            let frames = frames(response.bytes_stream());
            tokio::pin!(frames);

            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(frame) => match decode_frame::<AgentStreamEvent>(&frame) {
                        Some(event) => {
                            yield Ok(AgentEvent::from(event));
                        }
                        // Unknown names are skipped; a known name with a bad payload is fatal.
                        None if AgentStreamEvent::is_known_name(&frame.event) => {
                            yield Err(AgentError::StreamParseError(format!(
                                "malformed '{}' payload: {}",
                                frame.event, frame.data
                            )));
                            return;
                        }
                        None => {}
                    },
                    Err(e) => {
                        yield Err(AgentError::Transport(e.to_string()));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
