//! Mapping expressions.
//!
//! A step input is either a literal string or a reference wrapped in double
//! braces:
//!
//! | expression              | meaning                                          |
//! |-------------------------|--------------------------------------------------|
//! | `{{prev_output}}`       | output of the step right before this one         |
//! | `{{step:<id>}}`         | output of step `<id>`                            |
//! | `{{step:<id>.<path>}}`  | field `<path>` of step `<id>`'s output as JSON   |
//! | `{{input:<key>}}`       | runtime input collected before the run           |
//!
//! Expressions are parsed once, when a workflow is loaded. A string that looks
//! like a reference but is not a valid one is rejected there instead of
//! silently resolving to nothing later.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("missing step id in '{expr}'")]
    MissingStepId { expr: String },

    #[error("missing input key in '{expr}'")]
    MissingInputKey { expr: String },

    #[error("invalid field path '{path}' in '{expr}'")]
    InvalidFieldPath { expr: String, path: String },

    #[error("unknown reference '{expr}'")]
    UnknownReference { expr: String },
}

/// One segment of a dot path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// A parsed dot path such as `items.0.title` or `items[0].title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dot path. Returns `None` when a segment is empty or an index
    /// bracket is malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut segments = Vec::new();

        for part in raw.split('.') {
            if part.is_empty() {
                return None;
            }

            if let Some(bracket) = part.find('[') {
                let field = &part[..bracket];
                if !field.is_empty() {
                    segments.push(PathSegment::Field(field.to_string()));
                }
                for index in part[bracket..].split_terminator(']') {
                    let digits = index.strip_prefix('[')?;
                    segments.push(PathSegment::Index(digits.parse().ok()?));
                }
                if !part.ends_with(']') {
                    return None;
                }
            } else if let Ok(index) = part.parse::<usize>() {
                segments.push(PathSegment::Index(index));
            } else {
                segments.push(PathSegment::Field(part.to_string()));
            }
        }

        Some(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk the path through a JSON value.
    ///
    /// A numeric segment applied to an object is looked up as a string key.
    pub fn extract<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                PathSegment::Field(name) => current.get(name.as_str()),
                PathSegment::Index(index) => match current {
                    Value::Object(map) => map.get(&index.to_string()),
                    _ => current.get(*index),
                },
            })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A resolvable step input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingExpr {
    Literal(String),
    PrevOutput,
    StepRef {
        step_id: String,
        field: Option<FieldPath>,
    },
    RuntimeInput {
        key: String,
    },
}

impl MappingExpr {
    pub fn parse(raw: &str) -> Result<Self, MappingError> {
        let trimmed = raw.trim();
        let inner = match trimmed
            .strip_prefix("{{")
            .and_then(|rest| rest.strip_suffix("}}"))
        {
            // Text with several references, e.g. "{{a}} and {{b}}", is literal
            Some(inner) if !inner.contains("{{") && !inner.contains("}}") => inner.trim(),
            _ => return Ok(MappingExpr::Literal(raw.to_string())),
        };

        if inner == "prev_output" {
            return Ok(MappingExpr::PrevOutput);
        }

        if let Some(rest) = inner.strip_prefix("step:") {
            let rest = rest.trim();
            let (step_id, field) = match rest.split_once('.') {
                Some((step_id, path)) => {
                    let field =
                        FieldPath::parse(path).ok_or_else(|| MappingError::InvalidFieldPath {
                            expr: raw.to_string(),
                            path: path.to_string(),
                        })?;
                    (step_id, Some(field))
                }
                None => (rest, None),
            };

            if step_id.is_empty() {
                return Err(MappingError::MissingStepId {
                    expr: raw.to_string(),
                });
            }

            return Ok(MappingExpr::StepRef {
                step_id: step_id.to_string(),
                field,
            });
        }

        if let Some(key) = inner.strip_prefix("input:") {
            let key = key.trim();
            if key.is_empty() {
                return Err(MappingError::MissingInputKey {
                    expr: raw.to_string(),
                });
            }
            return Ok(MappingExpr::RuntimeInput {
                key: key.to_string(),
            });
        }

        Err(MappingError::UnknownReference {
            expr: raw.to_string(),
        })
    }

    /// The runtime input key this expression reads, if any.
    pub fn runtime_input_key(&self) -> Option<&str> {
        match self {
            MappingExpr::RuntimeInput { key } => Some(key),
            _ => None,
        }
    }

    /// The step this expression names explicitly, if any.
    pub fn referenced_step(&self) -> Option<&str> {
        match self {
            MappingExpr::StepRef { step_id, .. } => Some(step_id),
            _ => None,
        }
    }
}

impl fmt::Display for MappingExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingExpr::Literal(text) => f.write_str(text),
            MappingExpr::PrevOutput => f.write_str("{{prev_output}}"),
            MappingExpr::StepRef {
                step_id,
                field: None,
            } => write!(f, "{{{{step:{step_id}}}}}"),
            MappingExpr::StepRef {
                step_id,
                field: Some(path),
            } => write!(f, "{{{{step:{step_id}.{path}}}}}"),
            MappingExpr::RuntimeInput { key } => write!(f, "{{{{input:{key}}}}}"),
        }
    }
}

/// Text form of a JSON value extracted by a field path.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
