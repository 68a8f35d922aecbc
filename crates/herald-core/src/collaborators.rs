//! Contracts for the external systems the relay pipeline talks to.
//!
//! The pipeline depends only on these traits; concrete HTTP, storage and state
//! implementations live in their own crates and own their timeout policy.

use anyhow::Result;
use async_trait::async_trait;

use crate::{ActivityEntry, Issue, LookupError, SenderIdentity, UserImage};

/// Reads the tracker's activity timeline.
#[async_trait]
pub trait FeedReader: Send + Sync {
    /// Returns at most `limit` entries, newest first.
    async fn fetch_new_entries(&self, limit: usize) -> Result<Vec<ActivityEntry>>;
}

/// Resolves issues and author images from the tracker.
#[async_trait]
pub trait IssueLookup: Send + Sync {
    async fn get_issue(&self, key: &str) -> Result<Issue, LookupError>;

    /// Fetches the author's avatar. `Ok(None)` means the tracker has none.
    async fn get_user_image(&self, activity: &ActivityEntry) -> Result<Option<UserImage>>;
}

/// Posts chat messages under a per-message sender identity.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_message(&self, channel: &str, sender: &SenderIdentity, text: &str)
        -> Result<()>;
}

/// Durable, publicly addressable object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_object(&self, bytes: Vec<u8>, path: &str, content_type: Option<&str>)
        -> Result<()>;

    fn public_url(&self, path: &str) -> String;
}

/// Persistent cursor and avatar cache.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_cursor(&self) -> Result<Option<String>>;

    async fn set_cursor(&self, id: &str) -> Result<()>;

    async fn get_avatar(&self, username: &str) -> Result<Option<String>>;

    async fn set_avatar(&self, username: &str, url: &str) -> Result<()>;
}
