//! Configuration file loader for the `.stepflow/` directory structure.
//!
//! This module provides functionality to load and parse all configuration files
//! from the `.stepflow/` directory, including:
//! - `config.toml`: Global settings
//! - `workflows/*.json`, `workflows/*.yaml`, `workflows/*.yml`: Workflow definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use crate::workflow::Workflow;
use chrono::Utc;
use sf_protocol::config_models::GlobalConfig;
use sf_protocol::workflow_models::WorkflowDefinition;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Name of the project directory under the root.
pub const CONFIG_DIR: &str = ".stepflow";

const WORKFLOWS_DIR: &str = "workflows";

/// Loads all configuration from the `.stepflow/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.stepflow/` folder
///
/// # Returns
///
/// An `AppConfig` containing all loaded configuration, with workflows sorted
/// by id. If directories or files are missing, returns an empty/default
/// configuration rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML, JSON or YAML)
/// - A workflow has a malformed mapping or an invalid step reference
///
/// # Example
///
/// ```rust,no_run
/// use sf_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} workflows", config.workflows.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let sf_dir = root.join(CONFIG_DIR);

    if !sf_dir.exists() {
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&sf_dir)?;
    let mut workflows = load_workflows(&sf_dir)?;
    workflows.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(AppConfig { global, workflows })
}

/// Loads global configuration from `config.toml`.
fn load_global_config(sf_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = sf_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

fn is_workflow_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("json" | "yaml" | "yml")
    )
}

/// Loads all workflow definitions from `workflows/`.
fn load_workflows(sf_dir: &Path) -> ConfigResult<Vec<Workflow>> {
    let workflows_dir = sf_dir.join(WORKFLOWS_DIR);

    if !workflows_dir.exists() {
        return Ok(Vec::new());
    }

    let mut workflows = Vec::new();

    for entry in WalkDir::new(&workflows_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: workflows_dir.clone(),
            source,
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !is_workflow_file(path) {
            continue;
        }

        workflows.push(load_workflow(path)?);
    }

    Ok(workflows)
}

/// Load and validate a single workflow file.
///
/// The format follows the extension: `.json` or `.yaml`/`.yml`.
pub fn load_workflow(path: &Path) -> ConfigResult<Workflow> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let definition: WorkflowDefinition = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|source| ConfigError::JsonParse {
                path: path.to_path_buf(),
                source,
            })?
        }
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?
        }
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    debug!(path = %path.display(), id = %definition.id, "loaded workflow");

    Workflow::from_definition(definition).map_err(|source| ConfigError::InvalidWorkflow {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a workflow as `.stepflow/workflows/<id>.json`.
///
/// The written definition carries `updated_at` set to the current time.
/// Mapping references are written in their canonical form, so
/// `" {{ prev_output }} "` is stored as `"{{prev_output}}"`; literals are
/// written unchanged. Reloading yields an equal `Workflow`, but the stored
/// strings are not byte-identical to a non-canonical source file.
///
/// # Returns
///
/// The path of the written file.
pub fn save_workflow(root: &Path, workflow: &Workflow) -> ConfigResult<PathBuf> {
    let workflows_dir = root.join(CONFIG_DIR).join(WORKFLOWS_DIR);
    let path = workflows_dir.join(format!("{}.json", workflow.id));

    if workflow.id.is_empty() || workflow.id.contains(['/', '\\']) || workflow.id.starts_with('.') {
        return Err(ConfigError::FileWrite {
            path,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("workflow id '{}' is not a valid file name", workflow.id),
            ),
        });
    }

    std::fs::create_dir_all(&workflows_dir).map_err(|source| ConfigError::FileWrite {
        path: workflows_dir.clone(),
        source,
    })?;

    let mut definition = workflow.to_definition();
    definition.updated_at = Utc::now();

    let json = serde_json::to_string_pretty(&definition).map_err(|source| {
        ConfigError::JsonParse {
            path: path.clone(),
            source,
        }
    })?;

    std::fs::write(&path, json).map_err(|source| ConfigError::FileWrite {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), "saved workflow");
    Ok(path)
}
