//! Ephemeral run state models.
//!
//! A `RunState` is created fresh for every workflow invocation and discarded
//! when the run ends or is aborted. It is never persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Lifecycle status of a single step within one run.
///
/// Normal progression is `Pending -> Running -> Done | Error`. A step whose
/// condition is false goes straight from `Pending` to `Skipped`. `Done`,
/// `Error` and `Skipped` are terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Done,
    Error,
    Skipped,
}

impl StepStatus {
    /// Whether no further transition is allowed from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Error | StepStatus::Skipped)
    }
}

/// One tool invocation observed while a step was running.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ToolCallRecord {
    pub tool: String,

    #[serde(default)]
    pub args: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    /// Filled in when the matching tool result arrives.
    #[serde(default)]
    pub result: Option<String>,
}

/// Runtime record for one step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct StepRunState {
    pub status: StepStatus,

    /// Streamed output while running; final output once terminal.
    pub output: String,

    #[serde(default)]
    pub error: Option<String>,

    /// Tool calls in arrival order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Per-invocation record of every step, keyed by step id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct RunState {
    pub steps: BTreeMap<String, StepRunState>,
}
