//! Writes TypeScript bindings for every `sf-protocol` type.
//!
//! Usage: `sf-protocol-ts [OUT_DIR]` (defaults to `bindings/`).

use sf_protocol::{
    AgentRunRequest, AgentStreamEvent, GlobalConfig, RunRequest, RunState, WorkflowDefinition,
    WorkflowEvent,
};
use std::path::PathBuf;
use ts_rs::TS;

fn main() -> Result<(), ts_rs::ExportError> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("bindings"));

    // export_all_to follows dependencies, so payload and status types come along
    WorkflowDefinition::export_all_to(&out_dir)?;
    RunState::export_all_to(&out_dir)?;
    RunRequest::export_all_to(&out_dir)?;
    WorkflowEvent::export_all_to(&out_dir)?;
    AgentRunRequest::export_all_to(&out_dir)?;
    AgentStreamEvent::export_all_to(&out_dir)?;
    GlobalConfig::export_all_to(&out_dir)?;

    println!("TypeScript bindings written to {}", out_dir.display());
    Ok(())
}
