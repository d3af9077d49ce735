//! Persisted workflow models.
//!
//! This module defines the storage shape of a workflow as the dashboard saves
//! it. Mapping expressions and condition sources are kept as raw strings here;
//! `sf-core` parses them once when a workflow is loaded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Comparison applied by a step condition to its resolved source value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Resolved value is one of `values`.
    In,
    /// Resolved value is none of `values`.
    NotIn,
    /// Resolved value equals `values[0]`.
    Eq,
    /// Resolved value differs from `values[0]`.
    Ne,
    /// Resolved value contains any of `values` as a substring.
    Contains,
    /// Resolved value is blank.
    Empty,
    /// Resolved value is not blank.
    NotEmpty,
}

/// A stored step condition.
///
/// `source` is a mapping expression such as `{{step:classify}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ConditionDefinition {
    pub source: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

/// A stored pipeline step bound to an external agent.
///
/// # Example
///
/// ```json
/// {
///   "id": "summarize",
///   "agentId": "agent-42",
///   "agentName": "Summarizer",
///   "variableMappings": { "text": "{{prev_output}}", "tone": "formal" },
///   "condition": { "source": "{{step:classify}}", "operator": "eq", "values": ["long"] },
///   "defaultOutput": "(skipped)"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    pub id: String,

    pub agent_id: String,

    #[serde(default)]
    pub agent_name: String,

    /// Agent input name to mapping expression.
    #[serde(default)]
    pub variable_mappings: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionDefinition>,

    /// Output used in place of a real run when the condition skips this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output: Option<String>,
}

/// A stored workflow: an ordered, strictly sequential list of steps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct WorkflowDefinition {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub steps: Vec<StepDefinition>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}
