//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across the integration suites:
//! - Workflow fixtures and on-disk test projects
//! - Event assertions
//! - Scripted agent runtimes and wire bodies

pub mod assertions;
pub mod fixtures;
pub mod mock_agents;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_agents::*;
