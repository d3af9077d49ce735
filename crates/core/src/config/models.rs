//! Configuration models that aggregate all settings.

use crate::workflow::Workflow;
use sf_protocol::config_models::GlobalConfig;

/// Unified application configuration loaded from the `.stepflow/` directory.
///
/// - `config.toml`: global settings
/// - `workflows/*.json`, `workflows/*.yaml`: workflow definitions
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// All workflows, sorted by id.
    pub workflows: Vec<Workflow>,
}

impl AppConfig {
    pub fn workflow(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }
}
