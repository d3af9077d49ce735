//! Global configuration models for `.stepflow/config.toml`.
//!
//! This module defines the structure of the global configuration file that
//! controls project-wide settings for stepflow.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Default base URL of the local LLM server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Default number of characters kept in a `step_done` output preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Represents global settings from `.stepflow/config.toml`.
///
/// # Example
///
/// ```toml
/// # .stepflow/config.toml
/// server_url = "http://127.0.0.1:8000"
/// request_timeout_secs = 300
/// preview_chars = 200
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct GlobalConfig {
    /// Base URL of the server that exposes `/workflows` and `/agents`.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Cancel a run that takes longer than this many seconds.
    ///
    /// No timeout when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Length of the output preview sent with `step_done`.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: None,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}
