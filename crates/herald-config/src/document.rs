use std::{collections::BTreeMap, path::PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::ConfigError;

const DEFAULT_MAX_ACTIVITY_LOOKUP: usize = 50;
const DEFAULT_CONCURRENT_ISSUE_LOOKUPS: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;
const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone, Deserialize)]
/// Root of the configuration document.
pub struct HeraldConfig {
    pub state: StateConfig,
    pub atlassian: AtlassianConfig,
    pub slack: SlackConfig,
    pub resource_storage: ResourceStorageConfig,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    #[serde(default)]
    pub custom_jira_fields: Vec<CustomJiraFieldConfig>,
}

impl HeraldConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.atlassian.host.trim().is_empty() {
            return Err(ConfigError::Invalid("atlassian.host must not be empty".into()));
        }
        if self.atlassian.max_activity_lookup == 0 {
            return Err(ConfigError::Invalid(
                "atlassian.max_activity_lookup must be greater than 0".into(),
            ));
        }
        if self.atlassian.concurrent_issue_lookups == 0 {
            return Err(ConfigError::Invalid(
                "atlassian.concurrent_issue_lookups must be greater than 0".into(),
            ));
        }
        if self.state.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("state.path must not be empty".into()));
        }
        for (index, trigger) in self.triggers.iter().enumerate() {
            if trigger.slack_channel.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "trigger {index} has an empty slack_channel"
                )));
            }
            if trigger.match_fields.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "trigger {index} has no match fields"
                )));
            }
        }
        for custom in &self.custom_jira_fields {
            if custom.name.trim().is_empty() || custom.jira_field.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "custom_jira_fields entries need both name and jira_field".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// JSON document holding the cursor and the avatar cache.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtlassianConfig {
    /// Bare host (`example.atlassian.net`) or full base URL.
    pub host: String,
    #[serde(default = "default_max_activity_lookup")]
    pub max_activity_lookup: usize,
    #[serde(default = "default_concurrent_issue_lookups")]
    pub concurrent_issue_lookups: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    pub auth: AtlassianAuth,
}

impl AtlassianConfig {
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AtlassianAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,
    pub auth: SlackAuth,
    /// Sender overrides keyed by tracker username.
    #[serde(default)]
    pub users: BTreeMap<String, SlackUserOverride>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackAuth {
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlackUserOverride {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub icon_emoji: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "snake_case")]
pub enum ResourceStorageConfig {
    S3(S3StorageConfig),
    Local(LocalStorageConfig),
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    pub s3_region: String,
    pub s3_bucket: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// S3-compatible endpoint; path-style addressing is used when set.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    pub slack_channel: String,
    /// Field name to regex; every entry must match, evaluated in document order.
    #[serde(rename = "match")]
    pub match_fields: IndexMap<String, String>,
    /// Alias to underlying tracker field key, consulted before the global list.
    #[serde(default)]
    pub custom_fields: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomJiraFieldConfig {
    pub name: String,
    pub jira_field: String,
}

fn default_max_activity_lookup() -> usize {
    DEFAULT_MAX_ACTIVITY_LOOKUP
}

fn default_concurrent_issue_lookups() -> usize {
    DEFAULT_CONCURRENT_ISSUE_LOOKUPS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_retry_max_attempts() -> usize {
    DEFAULT_RETRY_MAX_ATTEMPTS
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

fn default_slack_api_base() -> String {
    DEFAULT_SLACK_API_BASE.to_string()
}
