//! Cache-aside resolution of author avatars into durable public URLs.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use herald_core::text_helpers::sanitize_for_path;
use herald_core::{ActivityIssue, BlobStore, IssueLookup, StateStore};
use tracing::{debug, info, warn, Span};

const AVATAR_PATH_PREFIX: &str = "users/images";

/// Username to public avatar URL, frozen once resolution finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvatarMap {
    urls: BTreeMap<String, String>,
}

impl AvatarMap {
    pub fn get(&self, username: &str) -> Option<&str> {
        self.urls.get(username).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl FromIterator<(String, String)> for AvatarMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

pub fn avatar_blob_path(username: &str) -> String {
    format!("{AVATAR_PATH_PREFIX}/{}", sanitize_for_path(username))
}

pub struct AvatarResolver {
    lookup: Arc<dyn IssueLookup>,
    blobs: Arc<dyn BlobStore>,
    state: Arc<dyn StateStore>,
    span: Span,
}

impl AvatarResolver {
    pub fn new(
        lookup: Arc<dyn IssueLookup>,
        blobs: Arc<dyn BlobStore>,
        state: Arc<dyn StateStore>,
        span: Span,
    ) -> Self {
        Self {
            lookup,
            blobs,
            state,
            span,
        }
    }

    /// Resolves each distinct author once, in first-occurrence order.
    ///
    /// Failures only leave the author out of the map; they never fail the run.
    pub async fn resolve(&self, items: &[ActivityIssue]) -> AvatarMap {
        let mut seen = HashSet::new();
        let mut urls = BTreeMap::new();

        for item in items {
            let username = item.activity.author.username.as_str();
            if username.is_empty() || !seen.insert(username) {
                continue;
            }
            if let Some(url) = self.resolve_one(item).await {
                urls.insert(username.to_string(), url);
            }
        }

        info!(
            parent: &self.span,
            resolved = urls.len(),
            authors = seen.len(),
            "resolved author avatars"
        );
        AvatarMap { urls }
    }

    async fn resolve_one(&self, item: &ActivityIssue) -> Option<String> {
        let username = item.activity.author.username.as_str();
        match self.state.get_avatar(username).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    parent: &self.span,
                    username,
                    error = %format!("{error:#}"),
                    "could not read cached avatar url"
                );
            }
        }

        let image = match self.lookup.get_user_image(&item.activity).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(parent: &self.span, username, "no avatar image available");
                return None;
            }
            Err(error) => {
                warn!(
                    parent: &self.span,
                    username,
                    error = %format!("{error:#}"),
                    "could not retrieve avatar image"
                );
                return None;
            }
        };

        let path = avatar_blob_path(username);
        if let Err(error) = self
            .blobs
            .put_object(image.bytes, &path, image.content_type.as_deref())
            .await
        {
            warn!(
                parent: &self.span,
                username,
                path = %path,
                error = %format!("{error:#}"),
                "failed to store avatar image"
            );
            return None;
        }

        let url = self.blobs.public_url(&path);
        if let Err(error) = self.state.set_avatar(username, &url).await {
            warn!(
                parent: &self.span,
                username,
                error = %format!("{error:#}"),
                "failed to cache avatar url"
            );
        }
        Some(url)
    }
}
