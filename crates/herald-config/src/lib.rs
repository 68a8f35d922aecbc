//! Configuration document for the herald relay.
//!
//! The document is a single JSON file whose path is supplied through the
//! `CONFIG` environment variable (or `--config`). Trigger regexes are compiled
//! exactly once here and handed to the pipeline as [`CompiledTrigger`]s.

mod document;
mod error;
mod triggers;

use std::path::Path;

pub use document::{
    AtlassianAuth, AtlassianConfig, CustomJiraFieldConfig, HeraldConfig, LocalStorageConfig,
    ResourceStorageConfig, S3StorageConfig, SlackAuth, SlackConfig, SlackUserOverride,
    StateConfig, TriggerConfig,
};
pub use error::ConfigError;
pub use triggers::{compile_triggers, CompiledTrigger, FieldAlias, FieldMatcher};

/// Environment variable holding the configuration document path.
pub const CONFIG_ENV_VAR: &str = "CONFIG";

/// A validated configuration document plus its compiled triggers.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub document: HeraldConfig,
    pub triggers: Vec<CompiledTrigger>,
}

/// Parses, validates and compiles a configuration document.
pub fn parse_config(raw: &str) -> Result<LoadedConfig, ConfigError> {
    let document = serde_json::from_str::<HeraldConfig>(raw).map_err(ConfigError::Parse)?;
    document.validate()?;
    let triggers = compile_triggers(&document.triggers, &document.custom_jira_fields)?;
    Ok(LoadedConfig { document, triggers })
}

/// Reads and parses the configuration document at `path`.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingPath {
            env_var: CONFIG_ENV_VAR,
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}
