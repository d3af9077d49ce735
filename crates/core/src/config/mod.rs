//! Configuration loading and management.
//!
//! This module loads global settings and workflow definitions from the
//! `.stepflow/` directory structure and saves edited workflows back.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_workflow, save_workflow, CONFIG_DIR};
pub use models::AppConfig;
