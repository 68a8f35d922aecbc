//! Blob stores that hold re-hosted author avatars.
//!
//! Objects are written once per user and served from a stable public URL, so
//! chat clients can render sender icons without tracker credentials.

mod local_blob_store;
mod s3_blob_store;

use std::sync::Arc;

use anyhow::Result;
use herald_config::ResourceStorageConfig;
use herald_core::BlobStore;

pub use local_blob_store::LocalBlobStore;
pub use s3_blob_store::S3BlobStore;

/// Builds the blob store selected by `resource_storage.driver`.
pub fn build_blob_store(config: &ResourceStorageConfig) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config {
        ResourceStorageConfig::S3(s3) => Arc::new(S3BlobStore::new(s3)),
        ResourceStorageConfig::Local(local) => Arc::new(LocalBlobStore::new(
            local.root.clone(),
            &local.public_base_url,
        )?),
    };
    Ok(store)
}
