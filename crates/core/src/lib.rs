//! # sf-core
//!
//! Core workflow execution for stepflow.
//!
//! This crate provides:
//! - A Frame Reader and Event Dispatcher for the SSE run protocol
//! - Mapping expressions, variable resolution and step conditions
//! - The step state machine and run tracking
//! - A pipeline controller that runs workflows against an agent runtime
//! - A client that follows workflow runs executed by a remote server
//! - Configuration loading from `.stepflow/` directory
//!
//! ## Modules
//!
//! - [`sse`]: Frame Reader and wire encoding
//! - [`dispatch`]: Frame decoding and event routing
//! - [`mapping`], [`workflow`]: Parsed workflow model
//! - [`resolver`], [`condition`]: Step input resolution and conditions
//! - [`state`]: Step state machine and run tracking
//! - [`agents`]: Agent runtime trait and implementations
//! - [`engine`]: Pipeline controller
//! - [`client`]: Remote workflow runs
//! - [`inputs`]: Runtime input collection
//! - [`config`]: Configuration loading and saving

pub mod agents;
pub mod client;
pub mod condition;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod inputs;
pub mod mapping;
pub mod resolver;
pub mod sse;
pub mod state;
pub mod workflow;
