use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Author of one activity as published by the tracker timeline.
pub struct Author {
    pub display_name: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Largest avatar link advertised for the author, if any.
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One timeline entry. Immutable once fetched.
pub struct ActivityEntry {
    pub id: String,
    /// Rich-text (HTML) title, e.g. `<a href="..">Bob</a> closed <a ..>PROJ-1</a>`.
    pub title: String,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    pub author: Author,
    #[serde(default)]
    pub target_title: Option<String>,
    #[serde(default)]
    pub object_title: Option<String>,
}

impl ActivityEntry {
    /// Returns the referenced issue key, preferring the activity target over
    /// the activity object. Titles that are not issue keys are skipped.
    pub fn issue_key(&self) -> Option<&str> {
        [self.target_title.as_deref(), self.object_title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|title| is_issue_key(title))
    }
}

/// Returns true for tracker keys shaped like `PROJ-123`.
pub fn is_issue_key(raw: &str) -> bool {
    let Some((project, number)) = raw.rsplit_once('-') else {
        return false;
    };
    let mut project_chars = project.chars();
    project_chars
        .next()
        .is_some_and(|first| first.is_ascii_uppercase())
        && project_chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
        && !number.is_empty()
        && number.chars().all(|ch| ch.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq)]
/// Closed set of shapes a tracker field value can take.
pub enum FieldValue {
    Null,
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Object(BTreeMap<String, FieldValue>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => Value::Number(number.clone()),
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => Self::Number(number),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
/// Full issue as returned by the tracker REST API. Fetched per run, never cached.
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
/// An activity paired with its resolved issue.
pub struct ActivityIssue {
    /// Chronological position of the activity within the run.
    pub sequence: usize,
    pub activity: ActivityEntry,
    pub issue: Issue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Who a chat message appears to come from.
pub struct SenderIdentity {
    pub name: String,
    /// Empty when no avatar could be resolved.
    pub icon_url: String,
    #[serde(default)]
    pub icon_emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub channel: String,
    pub sender: SenderIdentity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
