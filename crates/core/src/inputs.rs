//! Runtime inputs.
//!
//! Values for `{{input:*}}` references are collected once, before a run
//! starts, and stay fixed for the whole run.

use crate::workflow::Workflow;
use std::collections::BTreeMap;

/// Runtime input key to value.
pub type RuntimeInputs = BTreeMap<String, String>;

/// Supplies a value for a runtime input the caller has not preset.
pub trait InputProvider {
    fn provide(&mut self, key: &str) -> anyhow::Result<String>;
}

impl<F> InputProvider for F
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    fn provide(&mut self, key: &str) -> anyhow::Result<String> {
        self(key)
    }
}

/// Collect every runtime input the workflow references.
///
/// Keys already present in `preset` are taken from it; the provider is asked
/// exactly once for each remaining key. Preset keys the workflow never
/// references are left out of the result.
pub fn collect_runtime_inputs<P: InputProvider + ?Sized>(
    workflow: &Workflow,
    preset: &RuntimeInputs,
    provider: &mut P,
) -> anyhow::Result<RuntimeInputs> {
    let mut inputs = RuntimeInputs::new();
    for key in workflow.runtime_input_keys() {
        let value = match preset.get(&key) {
            Some(value) => value.clone(),
            None => provider.provide(&key)?,
        };
        inputs.insert(key, value);
    }
    Ok(inputs)
}
