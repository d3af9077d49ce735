//! # sf-protocol
//!
//! Core protocol definitions and data models for stepflow.
//!
//! This crate defines all shared data structures used for:
//! - Persisted workflow definitions (the JSON/YAML shape the dashboard saves)
//! - Ephemeral per-run step state
//! - The framed event vocabulary streamed by `POST /workflows/{id}/run`
//! - The agent runtime sub-protocol streamed per step
//!
//! ## Modules
//!
//! - [`agent_models`]: Agent runtime sub-protocol and per-step request body
//! - [`config_models`]: Global configuration from config.toml
//! - [`events`]: Workflow run events and the run request body
//! - [`run_models`]: Step status, tool-call records and run state
//! - [`workflow_models`]: Persisted workflow and step definitions
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, serde_json, chrono and ts-rs
//! - TypeScript generation: All types derive `TS` for the dashboard front end
//! - Independent compilation: No dependencies on other stepflow crates

pub mod agent_models;
pub mod config_models;
pub mod events;
pub mod run_models;
pub mod workflow_models;

// Re-export all public types for convenience
pub use agent_models::*;
pub use config_models::*;
pub use events::*;
pub use run_models::*;
pub use workflow_models::*;
