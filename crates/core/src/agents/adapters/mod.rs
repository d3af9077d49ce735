//! Agent runtime implementations.

pub mod http_agent;
pub mod mock_agent;

pub use http_agent::HttpAgentRuntime;
pub use mock_agent::MockAgentRuntime;
