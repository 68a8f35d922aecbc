use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use herald_config::{parse_config, LoadedConfig};
use herald_core::{
    ActivityEntry, Author, ChatTransport, FeedReader, Issue, IssueLookup, LookupError, Message,
    SenderIdentity, StateStore, UserImage,
};
use herald_pipeline::{ActivityRelay, RelayCollaborators, RelaySettings};
use herald_state::FileStateStore;
use herald_storage::LocalBlobStore;
use serde_json::json;
use tempfile::tempdir;
use tokio::sync::Mutex as AsyncMutex;
use tracing::Span;

struct ScriptedFeed {
    /// Newest first.
    entries: AsyncMutex<Vec<ActivityEntry>>,
    fetches: AsyncMutex<usize>,
}

impl ScriptedFeed {
    fn new(entries: Vec<ActivityEntry>) -> Self {
        Self {
            entries: AsyncMutex::new(entries),
            fetches: AsyncMutex::new(0),
        }
    }

    async fn publish(&self, entry: ActivityEntry) {
        self.entries.lock().await.insert(0, entry);
    }
}

#[async_trait]
impl FeedReader for ScriptedFeed {
    async fn fetch_new_entries(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        *self.fetches.lock().await += 1;
        Ok(self.entries.lock().await.iter().take(limit).cloned().collect())
    }
}

struct ScriptedTracker {
    issues: HashMap<String, Issue>,
    users_with_images: HashSet<String>,
    issue_requests: AsyncMutex<Vec<String>>,
    image_requests: AsyncMutex<Vec<String>>,
}

impl ScriptedTracker {
    fn new(issues: Vec<Issue>, users_with_images: &[&str]) -> Self {
        Self {
            issues: issues
                .into_iter()
                .map(|issue| (issue.key.clone(), issue))
                .collect(),
            users_with_images: users_with_images.iter().map(|name| name.to_string()).collect(),
            issue_requests: AsyncMutex::new(Vec::new()),
            image_requests: AsyncMutex::new(Vec::new()),
        }
    }

    async fn image_request_count(&self) -> usize {
        self.image_requests.lock().await.len()
    }
}

#[async_trait]
impl IssueLookup for ScriptedTracker {
    async fn get_issue(&self, key: &str) -> Result<Issue, LookupError> {
        self.issue_requests.lock().await.push(key.to_string());
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                key: key.to_string(),
            })
    }

    async fn get_user_image(&self, activity: &ActivityEntry) -> Result<Option<UserImage>> {
        let username = activity.author.username.clone();
        self.image_requests.lock().await.push(username.clone());
        if !self.users_with_images.contains(&username) {
            return Ok(None);
        }
        Ok(Some(UserImage {
            bytes: format!("image-of-{username}").into_bytes(),
            content_type: Some("image/png".to_string()),
        }))
    }
}

#[derive(Default)]
struct RecordingChat {
    fail_remaining: AsyncMutex<usize>,
    delivered: AsyncMutex<Vec<Message>>,
}

impl RecordingChat {
    async fn fail_next(&self, count: usize) {
        *self.fail_remaining.lock().await = count;
    }

    async fn delivered(&self) -> Vec<Message> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingChat {
    async fn post_message(&self, channel: &str, sender: &SenderIdentity, text: &str) -> Result<()> {
        let mut fail_remaining = self.fail_remaining.lock().await;
        if *fail_remaining > 0 {
            *fail_remaining -= 1;
            bail!("slack chat.postMessage failed: ratelimited");
        }
        self.delivered.lock().await.push(Message {
            channel: channel.to_string(),
            sender: sender.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}

fn entry(
    id: &str,
    username: &str,
    display_name: &str,
    issue_key: &str,
    verb: &str,
) -> ActivityEntry {
    ActivityEntry {
        id: id.to_string(),
        title: format!(
            r#"<a href="/people/{username}">{display_name}</a> {verb} <a href="/browse/{issue_key}">{issue_key}</a>"#
        ),
        updated: None,
        author: Author {
            display_name: display_name.to_string(),
            username: username.to_string(),
            email: None,
            photo_url: Some(format!("/avatars/{username}")),
        },
        target_title: None,
        object_title: Some(issue_key.to_string()),
    }
}

fn tracker_issue(key: &str, fields: serde_json::Value) -> Issue {
    serde_json::from_value(json!({"key": key, "fields": fields})).expect("issue json")
}

fn relay_config(state_path: &Path, blob_root: &Path) -> LoadedConfig {
    let raw = format!(
        r##"{{
            "state": {{"path": {state}}},
            "atlassian": {{
                "host": "example.atlassian.net",
                "max_activity_lookup": 20,
                "concurrent_issue_lookups": 3,
                "auth": {{"username": "bot", "password": "secret"}}
            }},
            "slack": {{
                "auth": {{"token": "xoxb-test"}},
                "users": {{"jdoe": {{"name": "", "icon_emoji": ":bee:"}}}}
            }},
            "resource_storage": {{
                "driver": "local",
                "root": {root},
                "public_base_url": "https://cdn.example.com/avatars"
            }},
            "triggers": [
                {{"slack_channel": "#team-yoda", "match": {{"team": "^Yoda$", "status": "Done"}}}},
                {{"slack_channel": "#labels", "match": {{"labels": "urgent"}},
                  "custom_fields": {{"labels": "customfield_20"}}}}
            ],
            "custom_jira_fields": [{{"name": "team", "jira_field": "customfield_10"}}]
        }}"##,
        state = json!(state_path),
        root = json!(blob_root),
    );
    parse_config(&raw).expect("valid relay config")
}

struct Fixture {
    feed: Arc<ScriptedFeed>,
    tracker: Arc<ScriptedTracker>,
    chat: Arc<RecordingChat>,
    state: Arc<FileStateStore>,
    relay: ActivityRelay,
}

fn fixture(root: &Path, entries: Vec<ActivityEntry>) -> Fixture {
    let config = relay_config(&root.join("state.json"), &root.join("blobs"));
    let feed = Arc::new(ScriptedFeed::new(entries));
    let tracker = Arc::new(ScriptedTracker::new(
        vec![
            tracker_issue(
                "LRN-1",
                json!({
                    "team": "Vader",
                    "customfield_10": {"value": "Yoda"},
                    "status": {"name": "Done"}
                }),
            ),
            tracker_issue(
                "LRN-2",
                json!({"customfield_10": {"value": "Yoda"}, "status": {"name": "In Progress"},
                       "customfield_20": ["backend", "urgent"]}),
            ),
            tracker_issue(
                "LRN-3",
                json!({"customfield_10": null, "team": "Yoda", "status": "Done",
                       "customfield_20": [{"value": "urgent"}]}),
            ),
        ],
        &["jdoe", "bob"],
    ));
    let chat = Arc::new(RecordingChat::default());
    let state = Arc::new(
        FileStateStore::load(config.document.state.path.clone()).expect("state store"),
    );
    let blobs = Arc::new(
        LocalBlobStore::new(root.join("blobs"), "https://cdn.example.com/avatars")
            .expect("blob store"),
    );
    let relay = ActivityRelay::new(
        RelayCollaborators {
            feed: feed.clone(),
            issues: tracker.clone(),
            chat: chat.clone(),
            blobs,
            state: state.clone(),
        },
        RelaySettings::from(&config),
        Span::none(),
    )
    .expect("relay");
    Fixture {
        feed,
        tracker,
        chat,
        state,
        relay,
    }
}

#[tokio::test]
async fn integration_relay_routes_by_aliases_in_timeline_and_trigger_order() {
    let temp = tempdir().expect("tempdir");
    let fixture = fixture(
        temp.path(),
        vec![
            entry("E4", "bob", "Bob", "LRN-404", "deleted"),
            entry("E3", "bob", "Bob", "LRN-3", "resolved"),
            entry("E2", "jdoe", "Jane Doe", "LRN-2", "labelled"),
            entry("E1", "jdoe", "Jane Doe", "LRN-1", "closed"),
        ],
    );

    let report = fixture.relay.run_once().await.expect("relay pass");

    let delivered = fixture
        .chat
        .delivered()
        .await
        .into_iter()
        .map(|message| (message.channel, message.text))
        .collect::<Vec<_>>();
    assert_eq!(
        delivered,
        vec![
            ("#team-yoda".to_string(), "closed </browse/LRN-1|LRN-1>".to_string()),
            ("#labels".to_string(), "labelled </browse/LRN-2|LRN-2>".to_string()),
            ("#team-yoda".to_string(), "resolved </browse/LRN-3|LRN-3>".to_string()),
            ("#labels".to_string(), "resolved </browse/LRN-3|LRN-3>".to_string()),
        ]
    );
    assert_eq!(report.new_activities, 4);
    assert_eq!(report.enriched, 3);
    assert_eq!(report.messages_posted, 4);
    assert_eq!(
        fixture.state.get_cursor().await.expect("cursor").as_deref(),
        Some("E4")
    );
}

#[tokio::test]
async fn integration_relay_caches_avatars_across_runs_and_applies_sender_overrides() {
    let temp = tempdir().expect("tempdir");
    let fixture = fixture(
        temp.path(),
        vec![
            entry("E2", "jdoe", "Jane Doe", "LRN-1", "reopened"),
            entry("E1", "jdoe", "Jane Doe", "LRN-1", "closed"),
        ],
    );

    fixture.relay.run_once().await.expect("first pass");
    assert_eq!(fixture.tracker.image_request_count().await, 1);
    let stored = std::fs::read(temp.path().join("blobs/users/images/jdoe")).expect("blob");
    assert_eq!(stored, b"image-of-jdoe");

    fixture
        .feed
        .publish(entry("E3", "jdoe", "Jane Doe", "LRN-1", "commented on"))
        .await;
    let report = fixture.relay.run_once().await.expect("second pass");

    assert_eq!(report.new_activities, 1);
    assert_eq!(fixture.tracker.image_request_count().await, 1);
    let delivered = fixture.chat.delivered().await;
    assert_eq!(delivered.len(), 3);
    for message in &delivered {
        assert_eq!(message.sender.name, "Jane Doe");
        assert_eq!(
            message.sender.icon_url,
            "https://cdn.example.com/avatars/users/images/jdoe"
        );
        assert_eq!(message.sender.icon_emoji.as_deref(), Some(":bee:"));
    }
    assert_eq!(delivered[2].text, "commented on </browse/LRN-1|LRN-1>");
}

#[tokio::test]
async fn integration_relay_redelivers_after_aborted_pass_instead_of_skipping() {
    let temp = tempdir().expect("tempdir");
    let fixture = fixture(
        temp.path(),
        vec![
            entry("E2", "bob", "Bob", "LRN-3", "resolved"),
            entry("E1", "jdoe", "Jane Doe", "LRN-1", "closed"),
        ],
    );
    fixture.chat.fail_next(1).await;

    fixture
        .relay
        .run_once()
        .await
        .expect_err("chat failure aborts the pass");
    assert_eq!(fixture.state.get_cursor().await.expect("cursor"), None);

    let report = fixture.relay.run_once().await.expect("retry pass");
    assert_eq!(report.messages_posted, 3);
    assert_eq!(report.cursor.as_deref(), Some("E2"));

    let reloaded = FileStateStore::load(temp.path().join("state.json")).expect("reload");
    assert_eq!(
        reloaded.get_cursor().await.expect("cursor").as_deref(),
        Some("E2")
    );
    assert_eq!(*fixture.feed.fetches.lock().await, 2);
}
