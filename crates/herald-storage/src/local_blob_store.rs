use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use herald_core::BlobStore;

/// Directory-backed store for deployments that serve avatars from a web root.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, public_base_url: &str) -> Result<Self> {
        if root.as_os_str().is_empty() {
            bail!("local blob store root cannot be empty");
        }
        let public_base_url = public_base_url.trim().trim_end_matches('/').to_string();
        if public_base_url.is_empty() {
            bail!("local blob store public_base_url cannot be empty");
        }
        Ok(Self {
            root,
            public_base_url,
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            bail!("invalid blob path '{path}'");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put_object(
        &self,
        bytes: Vec<u8>,
        path: &str,
        _content_type: Option<&str>,
    ) -> Result<()> {
        let destination = self.resolve(path)?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&destination, bytes)
            .await
            .with_context(|| format!("failed to write blob {}", destination.display()))?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url,
            path.trim_start_matches('/')
        )
    }
}
