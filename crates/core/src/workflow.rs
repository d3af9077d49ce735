//! Parsed workflow model.
//!
//! `Workflow` is the runtime form of a `WorkflowDefinition`: every mapping
//! expression and condition source is parsed, step ids are unique, and every
//! explicit step reference points at an earlier step.

use crate::mapping::{MappingError, MappingExpr};
use chrono::{DateTime, Utc};
use sf_protocol::workflow_models::{
    ConditionDefinition, ConditionOperator, StepDefinition, WorkflowDefinition,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("step '{step_id}', mapping '{name}': {source}")]
    InvalidMapping {
        step_id: String,
        name: String,
        source: MappingError,
    },

    #[error("step '{step_id}', condition source: {source}")]
    InvalidCondition {
        step_id: String,
        source: MappingError,
    },

    #[error("duplicate step id '{step_id}'")]
    DuplicateStep { step_id: String },

    #[error("step '{step_id}' references unknown step '{target}'")]
    UnknownStep { step_id: String, target: String },

    #[error("step '{step_id}' references step '{target}', which does not run before it")]
    ForwardReference { step_id: String, target: String },
}

/// Decides whether a step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub source: MappingExpr,
    pub operator: ConditionOperator,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub variable_mappings: BTreeMap<String, MappingExpr>,
    pub condition: Option<Condition>,
    pub default_output: Option<String>,
}

impl Step {
    /// Every expression in this step: mappings first, then the condition source.
    pub fn expressions(&self) -> impl Iterator<Item = &MappingExpr> {
        self.variable_mappings
            .values()
            .chain(self.condition.iter().map(|c| &c.source))
    }
}

/// A strictly ordered chain of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Parse and validate a stored definition.
    pub fn from_definition(definition: WorkflowDefinition) -> Result<Self, WorkflowError> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, step) in definition.steps.iter().enumerate() {
            if positions.insert(step.id.clone(), index).is_some() {
                return Err(WorkflowError::DuplicateStep {
                    step_id: step.id.clone(),
                });
            }
        }

        let mut steps = Vec::with_capacity(definition.steps.len());
        for (index, step) in definition.steps.into_iter().enumerate() {
            let step = parse_step(step)?;
            for target in step.expressions().filter_map(MappingExpr::referenced_step) {
                match positions.get(target) {
                    None => {
                        return Err(WorkflowError::UnknownStep {
                            step_id: step.id.clone(),
                            target: target.to_string(),
                        })
                    }
                    Some(&position) if position >= index => {
                        return Err(WorkflowError::ForwardReference {
                            step_id: step.id.clone(),
                            target: target.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }
            steps.push(step);
        }

        Ok(Self {
            id: definition.id,
            name: definition.name,
            description: definition.description,
            steps,
            created_at: definition.created_at,
            updated_at: definition.updated_at,
        })
    }

    /// Render back to the persisted shape. Mapping references render in their
    /// canonical form.
    pub fn to_definition(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            steps: self
                .steps
                .iter()
                .map(|step| StepDefinition {
                    id: step.id.clone(),
                    agent_id: step.agent_id.clone(),
                    agent_name: step.agent_name.clone(),
                    variable_mappings: step
                        .variable_mappings
                        .iter()
                        .map(|(name, expr)| (name.clone(), expr.to_string()))
                        .collect(),
                    condition: step.condition.as_ref().map(|c| ConditionDefinition {
                        source: c.source.to_string(),
                        operator: c.operator,
                        values: c.values.clone(),
                    }),
                    default_output: step.default_output.clone(),
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Every `{{input:*}}` key referenced by any mapping or condition.
    pub fn runtime_input_keys(&self) -> BTreeSet<String> {
        self.steps
            .iter()
            .flat_map(Step::expressions)
            .filter_map(MappingExpr::runtime_input_key)
            .map(str::to_string)
            .collect()
    }
}

fn parse_step(step: StepDefinition) -> Result<Step, WorkflowError> {
    let mut variable_mappings = BTreeMap::new();
    for (name, raw) in step.variable_mappings {
        let expr = MappingExpr::parse(&raw).map_err(|source| WorkflowError::InvalidMapping {
            step_id: step.id.clone(),
            name: name.clone(),
            source,
        })?;
        variable_mappings.insert(name, expr);
    }

    let condition = step
        .condition
        .map(|c| {
            MappingExpr::parse(&c.source)
                .map(|source| Condition {
                    source,
                    operator: c.operator,
                    values: c.values,
                })
                .map_err(|source| WorkflowError::InvalidCondition {
                    step_id: step.id.clone(),
                    source,
                })
        })
        .transpose()?;

    Ok(Step {
        id: step.id,
        agent_id: step.agent_id,
        agent_name: step.agent_name,
        variable_mappings,
        condition,
        default_output: step.default_output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_def(id: &str, mappings: &[(&str, &str)]) -> StepDefinition {
        StepDefinition {
            id: id.to_string(),
            agent_id: format!("agent-{id}"),
            agent_name: id.to_uppercase(),
            variable_mappings: mappings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            condition: None,
            default_output: None,
        }
    }

    fn workflow_def(steps: Vec<StepDefinition>) -> WorkflowDefinition {
        WorkflowDefinition {
            id: "wf".to_string(),
            name: "test".to_string(),
            description: String::new(),
            steps,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_definition_parses_expressions() {
        let mut second = step_def("b", &[("text", "{{step:a.title}}"), ("tone", "dry")]);
        second.condition = Some(ConditionDefinition {
            source: "{{input:mode}}".to_string(),
            operator: ConditionOperator::Eq,
            values: vec!["full".to_string()],
        });
        let def = workflow_def(vec![step_def("a", &[("q", "{{input:question}}")]), second]);

        let workflow = Workflow::from_definition(def.clone()).unwrap();

        assert_eq!(workflow.steps.len(), 2);
        assert_eq!(workflow.step_index("b"), Some(1));
        assert_eq!(
            workflow.steps[1].variable_mappings["tone"],
            MappingExpr::Literal("dry".to_string())
        );
        assert_eq!(
            workflow.runtime_input_keys().into_iter().collect::<Vec<_>>(),
            vec!["mode".to_string(), "question".to_string()]
        );
        assert_eq!(workflow.to_definition(), def);
    }

    #[test]
    fn test_rejects_malformed_mapping() {
        let def = workflow_def(vec![step_def("a", &[("q", "{{input:}}")])]);

        let err = Workflow::from_definition(def).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidMapping { ref name, .. } if name == "q"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let def = workflow_def(vec![step_def("a", &[]), step_def("a", &[])]);

        assert_eq!(
            Workflow::from_definition(def).unwrap_err(),
            WorkflowError::DuplicateStep {
                step_id: "a".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_references_that_do_not_point_backwards() {
        let forward = workflow_def(vec![step_def("a", &[("x", "{{step:b}}")]), step_def("b", &[])]);
        assert!(matches!(
            Workflow::from_definition(forward),
            Err(WorkflowError::ForwardReference { .. })
        ));

        let itself = workflow_def(vec![step_def("a", &[("x", "{{step:a}}")])]);
        assert!(matches!(
            Workflow::from_definition(itself),
            Err(WorkflowError::ForwardReference { .. })
        ));

        let unknown = workflow_def(vec![step_def("a", &[("x", "{{step:ghost.title}}")])]);
        assert!(matches!(
            Workflow::from_definition(unknown),
            Err(WorkflowError::UnknownStep { ref target, .. }) if target == "ghost"
        ));
    }

    #[test]
    fn test_condition_source_is_validated() {
        let mut step = step_def("b", &[]);
        step.condition = Some(ConditionDefinition {
            source: "{{step:later}}".to_string(),
            operator: ConditionOperator::NotEmpty,
            values: vec![],
        });
        let def = workflow_def(vec![step, step_def("later", &[])]);

        assert!(matches!(
            Workflow::from_definition(def),
            Err(WorkflowError::ForwardReference { .. })
        ));
    }
}
