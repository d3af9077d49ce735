//! Error types for configuration loading.
//!
//! This module defines all errors that can occur while reading, parsing and
//! saving files under `.stepflow/`.

use crate::workflow::WorkflowError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and saving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a workflow file.
    #[error("Failed to write file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to parse a YAML workflow.
    #[error("Failed to parse YAML file at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Failed to parse or render a JSON workflow.
    #[error("Failed to handle JSON file at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to walk directory structure.
    #[error("Failed to traverse directory {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// The workflow parsed but its mappings or step references are invalid.
    #[error("Invalid workflow in {path}: {source}")]
    InvalidWorkflow {
        path: PathBuf,
        source: WorkflowError,
    },

    /// The file extension is not one of `json`, `yaml` or `yml`.
    #[error("Unsupported workflow file {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
