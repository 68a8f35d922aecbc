//! Scripted in-memory collaborators for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use herald_core::{
    ActivityEntry, Author, BlobStore, ChatTransport, FeedReader, Issue, IssueLookup,
    LookupError, Message, SenderIdentity, StateStore, UserImage,
};
use tokio::sync::Mutex;

pub(crate) fn activity(id: &str, username: &str, issue_key: &str, title: &str) -> ActivityEntry {
    ActivityEntry {
        id: id.to_string(),
        title: title.to_string(),
        updated: None,
        author: Author {
            display_name: format!("{username} display"),
            username: username.to_string(),
            email: None,
            photo_url: Some(format!("/avatars/{username}")),
        },
        target_title: Some(issue_key.to_string()),
        object_title: None,
    }
}

pub(crate) fn issue(key: &str, fields: serde_json::Value) -> Issue {
    serde_json::from_value(serde_json::json!({"key": key, "fields": fields})).expect("issue")
}

#[derive(Default)]
pub(crate) struct FakeIssueLookup {
    issues: HashMap<String, Issue>,
    failing_issues: HashSet<String>,
    delays: HashMap<String, Duration>,
    lookup_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    images: HashMap<String, Vec<u8>>,
    failing_images: HashSet<String>,
    issue_calls: Mutex<Vec<String>>,
    image_calls: Mutex<Vec<String>>,
}

impl FakeIssueLookup {
    pub(crate) fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.key.clone(), issue);
        self
    }

    pub(crate) fn with_failing_issue(mut self, key: &str) -> Self {
        self.failing_issues.insert(key.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, key: &str, delay_ms: u64) -> Self {
        self.delays
            .insert(key.to_string(), Duration::from_millis(delay_ms));
        self
    }

    /// Holds every issue lookup open for `delay_ms` so overlap is observable.
    pub(crate) fn with_lookup_delay(mut self, delay_ms: u64) -> Self {
        self.lookup_delay = Some(Duration::from_millis(delay_ms));
        self
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn with_image(mut self, username: &str, bytes: &[u8]) -> Self {
        self.images.insert(username.to_string(), bytes.to_vec());
        self
    }

    pub(crate) fn with_failing_image(mut self, username: &str) -> Self {
        self.failing_images.insert(username.to_string());
        self
    }

    pub(crate) async fn issue_calls(&self) -> Vec<String> {
        self.issue_calls.lock().await.clone()
    }

    pub(crate) async fn image_calls(&self) -> Vec<String> {
        self.image_calls.lock().await.clone()
    }
}

#[async_trait]
impl IssueLookup for FakeIssueLookup {
    async fn get_issue(&self, key: &str) -> Result<Issue, LookupError> {
        self.issue_calls.lock().await.push(key.to_string());
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(key).or(self.lookup_delay.as_ref()) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_issues.contains(key) {
            return Err(LookupError::Transport(anyhow!("connection reset looking up {key}")));
        }
        self.issues
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                key: key.to_string(),
            })
    }

    async fn get_user_image(&self, activity: &ActivityEntry) -> Result<Option<UserImage>> {
        let username = activity.author.username.clone();
        self.image_calls.lock().await.push(username.clone());
        if self.failing_images.contains(&username) {
            bail!("image download for {username} timed out");
        }
        Ok(self.images.get(&username).map(|bytes| UserImage {
            bytes: bytes.clone(),
            content_type: Some("image/png".to_string()),
        }))
    }
}

#[derive(Default)]
pub(crate) struct FakeBlobStore {
    failing_paths: HashSet<String>,
    puts: Mutex<Vec<String>>,
}

impl FakeBlobStore {
    pub(crate) fn failing_for(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    pub(crate) async fn put_paths(&self) -> Vec<String> {
        self.puts.lock().await.clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn put_object(
        &self,
        _bytes: Vec<u8>,
        path: &str,
        _content_type: Option<&str>,
    ) -> Result<()> {
        if self.failing_paths.contains(path) {
            bail!("bucket unavailable for {path}");
        }
        self.puts.lock().await.push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://blobs.example.com/{path}")
    }
}

#[derive(Default)]
pub(crate) struct FakeStateStore {
    cursor: Mutex<Option<String>>,
    avatars: Mutex<BTreeMap<String, String>>,
    cursor_writes: Mutex<Vec<String>>,
    fail_avatar_writes: bool,
    fail_cursor_writes: bool,
}

impl FakeStateStore {
    pub(crate) fn with_cursor(mut self, id: &str) -> Self {
        *self.cursor.get_mut() = Some(id.to_string());
        self
    }

    pub(crate) fn with_avatar(mut self, username: &str, url: &str) -> Self {
        self.avatars
            .get_mut()
            .insert(username.to_string(), url.to_string());
        self
    }

    pub(crate) fn failing_avatar_writes(mut self) -> Self {
        self.fail_avatar_writes = true;
        self
    }

    pub(crate) fn failing_cursor_writes(mut self) -> Self {
        self.fail_cursor_writes = true;
        self
    }

    pub(crate) async fn avatar(&self, username: &str) -> Option<String> {
        self.avatars.lock().await.get(username).cloned()
    }

    pub(crate) async fn cursor_writes(&self) -> Vec<String> {
        self.cursor_writes.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for FakeStateStore {
    async fn get_cursor(&self) -> Result<Option<String>> {
        Ok(self.cursor.lock().await.clone())
    }

    async fn set_cursor(&self, id: &str) -> Result<()> {
        if self.fail_cursor_writes {
            bail!("state store is read-only");
        }
        self.cursor_writes.lock().await.push(id.to_string());
        *self.cursor.lock().await = Some(id.to_string());
        Ok(())
    }

    async fn get_avatar(&self, username: &str) -> Result<Option<String>> {
        Ok(self.avatars.lock().await.get(username).cloned())
    }

    async fn set_avatar(&self, username: &str, url: &str) -> Result<()> {
        if self.fail_avatar_writes {
            bail!("state store is read-only");
        }
        self.avatars
            .lock()
            .await
            .insert(username.to_string(), url.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeFeedReader {
    entries: Vec<ActivityEntry>,
    fail: bool,
    limits: Mutex<Vec<usize>>,
}

impl FakeFeedReader {
    /// `entries` newest first, as the tracker publishes them.
    pub(crate) fn with_entries(entries: Vec<ActivityEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) async fn limits(&self) -> Vec<usize> {
        self.limits.lock().await.clone()
    }
}

#[async_trait]
impl FeedReader for FakeFeedReader {
    async fn fetch_new_entries(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
        self.limits.lock().await.push(limit);
        if self.fail {
            bail!("activity feed returned status 503");
        }
        Ok(self.entries.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
pub(crate) struct FakeChatTransport {
    fail_on_post: Option<usize>,
    posts: Mutex<Vec<Message>>,
}

impl FakeChatTransport {
    /// Fails the post with this zero-based index.
    pub(crate) fn failing_on(index: usize) -> Self {
        Self {
            fail_on_post: Some(index),
            ..Self::default()
        }
    }

    pub(crate) async fn posts(&self) -> Vec<Message> {
        self.posts.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for FakeChatTransport {
    async fn post_message(
        &self,
        channel: &str,
        sender: &SenderIdentity,
        text: &str,
    ) -> Result<()> {
        let mut posts = self.posts.lock().await;
        if self.fail_on_post == Some(posts.len()) {
            bail!("chat.postMessage failed: channel_not_found");
        }
        posts.push(Message {
            channel: channel.to_string(),
            sender: sender.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}
