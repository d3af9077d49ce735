//! Agent runtime abstraction.
//!
//! The pipeline controller talks to agents only through the `AgentRuntime`
//! trait. `HttpAgentRuntime` reaches a real runtime server;
//! `MockAgentRuntime` replays scripted events in tests.

pub mod adapters;
pub mod base;

pub use adapters::{HttpAgentRuntime, MockAgentRuntime};
pub use base::{AgentError, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime};
