//! Test fixtures for creating sample workflows and projects.

use sf_core::config::{save_workflow, CONFIG_DIR};
use sf_core::workflow::Workflow;
use sf_protocol::workflow_models::{
    ConditionDefinition, ConditionOperator, StepDefinition, WorkflowDefinition,
};
use tempfile::TempDir;

/// Build a step definition with the given mappings.
#[allow(dead_code)]
pub fn step(id: &str, agent_id: &str, mappings: &[(&str, &str)]) -> StepDefinition {
    StepDefinition {
        id: id.to_string(),
        agent_id: agent_id.to_string(),
        agent_name: agent_id.to_uppercase(),
        variable_mappings: mappings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        condition: None,
        default_output: None,
    }
}

/// Attach a condition and a default output to a step.
#[allow(dead_code)]
pub fn conditional(
    mut step: StepDefinition,
    source: &str,
    operator: ConditionOperator,
    values: &[&str],
    default_output: Option<&str>,
) -> StepDefinition {
    step.condition = Some(ConditionDefinition {
        source: source.to_string(),
        operator,
        values: values.iter().map(|v| v.to_string()).collect(),
    });
    step.default_output = default_output.map(str::to_string);
    step
}

#[allow(dead_code)]
pub fn workflow(id: &str, steps: Vec<StepDefinition>) -> Workflow {
    Workflow::from_definition(WorkflowDefinition {
        id: id.to_string(),
        name: format!("{id} workflow"),
        description: String::new(),
        steps,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    })
    .expect("fixture workflow should be valid")
}

/// The three-step workflow used across suites.
///
/// `draft` takes a runtime input, `review` reads `{{prev_output}}`, and
/// `publish` runs only when the review approves.
#[allow(dead_code)]
pub fn review_workflow() -> Workflow {
    workflow(
        "review",
        vec![
            step("draft", "writer", &[("topic", "{{input:topic}}")]),
            step("review", "critic", &[("text", "{{prev_output}}")]),
            conditional(
                step("publish", "publisher", &[("body", "{{step:draft}}")]),
                "{{step:review}}",
                ConditionOperator::Contains,
                &["yes"],
                Some("not published"),
            ),
        ],
    )
}

/// Create a temporary project with `.stepflow/` holding the review workflow.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    std::fs::create_dir_all(temp_dir.path().join(CONFIG_DIR))?;
    std::fs::write(
        temp_dir.path().join(CONFIG_DIR).join("config.toml"),
        "server_url = \"http://127.0.0.1:1\"\npreview_chars = 16\n",
    )?;
    save_workflow(temp_dir.path(), &review_workflow())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(temp_dir)
}
