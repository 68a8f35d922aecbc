use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
/// Fatal configuration problems, raised before any network activity.
pub enum ConfigError {
    #[error("environment variable {env_var:?} for config not found")]
    MissingPath { env_var: &'static str },
    #[error("could not open config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config document: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Invalid regexp {pattern:?} for field {field:?} in trigger {trigger_index}: {source}")]
    InvalidRegex {
        trigger_index: usize,
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
