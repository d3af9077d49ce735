//! Variable resolution.
//!
//! A `Resolver` is built right before a step executes, so every reference it
//! evaluates observes the latest finished state. Resolution never fails: a
//! reference that cannot be satisfied degrades to an empty string.

use crate::inputs::RuntimeInputs;
use crate::mapping::{value_to_text, FieldPath, MappingExpr};
use crate::workflow::Workflow;
use sf_protocol::run_models::{RunState, StepStatus};
use std::collections::BTreeMap;
use tracing::debug;

pub struct Resolver<'a> {
    workflow: &'a Workflow,
    state: &'a RunState,
    inputs: &'a RuntimeInputs,
    current: usize,
}

impl<'a> Resolver<'a> {
    /// `current` is the index of the step about to execute.
    pub fn new(
        workflow: &'a Workflow,
        state: &'a RunState,
        inputs: &'a RuntimeInputs,
        current: usize,
    ) -> Self {
        Self {
            workflow,
            state,
            inputs,
            current,
        }
    }

    pub fn resolve(&self, expr: &MappingExpr) -> String {
        match expr {
            MappingExpr::Literal(text) => text.clone(),
            MappingExpr::PrevOutput => self
                .current
                .checked_sub(1)
                .and_then(|index| self.workflow.steps.get(index))
                .map(|step| self.step_output(&step.id))
                .unwrap_or_default(),
            MappingExpr::StepRef {
                step_id,
                field: None,
            } => self.step_output(step_id),
            MappingExpr::StepRef {
                step_id,
                field: Some(path),
            } => extract_field(&self.step_output(step_id), path),
            MappingExpr::RuntimeInput { key } => self.inputs.get(key).cloned().unwrap_or_default(),
        }
    }

    /// Resolve every mapping of a step.
    pub fn resolve_all(&self, mappings: &BTreeMap<String, MappingExpr>) -> BTreeMap<String, String> {
        mappings
            .iter()
            .map(|(name, expr)| (name.clone(), self.resolve(expr)))
            .collect()
    }

    /// Output of a step as later steps see it.
    ///
    /// A skipped step's output already holds its default output. A step that
    /// never ran has no output.
    fn step_output(&self, step_id: &str) -> String {
        match self.state.steps.get(step_id) {
            Some(run) if run.status != StepStatus::Pending => run.output.clone(),
            _ => String::new(),
        }
    }
}

fn extract_field(output: &str, path: &FieldPath) -> String {
    let value: serde_json::Value = match serde_json::from_str(output) {
        Ok(value) => value,
        Err(_) => {
            debug!(path = %path, "step output is not JSON; field resolves to empty");
            return String::new();
        }
    };

    path.extract(&value).map(value_to_text).unwrap_or_default()
}
