use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use herald_config::S3StorageConfig;
use herald_core::BlobStore;

const CREDENTIALS_PROVIDER: &str = "herald-config";

/// S3 bucket store. Objects are uploaded with the `public-read` canned ACL.
#[derive(Clone)]
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3BlobStore {
    pub fn new(config: &S3StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.aws_access_key_id.trim(),
            config.aws_secret_access_key.trim(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let endpoint_url = config
            .endpoint_url
            .as_deref()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty());

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.trim().to_string()))
            .credentials_provider(credentials);
        if let Some(endpoint_url) = endpoint_url.as_deref() {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.s3_bucket.trim().to_string(),
            region: config.s3_region.trim().to_string(),
            endpoint_url,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: Option<&str>,
    ) -> Result<()> {
        let key = path.trim_start_matches('/');
        if key.is_empty() {
            bail!("s3 object key cannot be empty");
        }
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .with_context(|| format!("failed to upload s3://{}/{}", self.bucket, key))?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        let key = path.trim_start_matches('/');
        match self.endpoint_url.as_deref() {
            Some(endpoint_url) => format!("{endpoint_url}/{}/{key}", self.bucket),
            None => format!(
                "https://s3-{}.amazonaws.com/{}/{key}",
                self.region, self.bucket
            ),
        }
    }
}
