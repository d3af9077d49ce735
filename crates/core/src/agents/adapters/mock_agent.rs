//! Scripted agent runtime for testing.

use crate::agents::base::{AgentError, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Script {
    Events(Vec<Result<AgentEvent, AgentError>>),
    /// Yields the events, then never completes.
    Stall(Vec<AgentEvent>),
    Refuse(AgentError),
}

/// Answers each agent id with a fixed script and records every request.
#[derive(Debug, Default)]
pub struct MockAgentRuntime {
    scripts: HashMap<String, Script>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl MockAgentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream `chunks` in order, then complete.
    pub fn with_output(self, agent_id: &str, chunks: &[&str]) -> Self {
        let mut events: Vec<_> = chunks
            .iter()
            .map(|chunk| Ok(AgentEvent::Stream(chunk.to_string())))
            .collect();
        events.push(Ok(AgentEvent::Completed { output: None }));
        self.with_events(agent_id, events)
    }

    pub fn with_events(mut self, agent_id: &str, events: Vec<Result<AgentEvent, AgentError>>) -> Self {
        self.scripts.insert(agent_id.to_string(), Script::Events(events));
        self
    }

    pub fn with_stall(mut self, agent_id: &str, events: Vec<AgentEvent>) -> Self {
        self.scripts.insert(agent_id.to_string(), Script::Stall(events));
        self
    }

    /// Refuse every invocation with `error`.
    pub fn with_refusal(mut self, agent_id: &str, error: AgentError) -> Self {
        self.scripts.insert(agent_id.to_string(), Script::Refuse(error));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, agent_id: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.agent_id == agent_id)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The request sent for a step, if it was invoked.
    pub fn request_for_step(&self, step_id: &str) -> Option<AgentRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.step_id == step_id)
            .cloned()
    }
}

#[async_trait]
impl AgentRuntime for MockAgentRuntime {
    async fn execute(&self, request: &AgentRequest) -> Result<AgentEventStream, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.scripts.get(&request.agent_id) {
            None => Err(AgentError::NotAvailable(format!(
                "no mock agent '{}'",
                request.agent_id
            ))),
            Some(Script::Refuse(error)) => Err(error.clone()),
            Some(Script::Events(events)) => Ok(Box::pin(tokio_stream::iter(events.clone()))),
            Some(Script::Stall(events)) => {
                let events = events.clone();
                Ok(Box::pin(async_stream::stream! {
                    for event in events {
                        yield Ok(event);
                    }
                    std::future::pending::<()>().await;
                }))
            }
        }
    }
}
