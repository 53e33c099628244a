//! S3 object store (requires the `s3` feature).

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use quadmart_core::error::{AppError, ErrorKind};
use quadmart_core::result::AppResult;
use quadmart_core::traits::object_store::ObjectStore;

/// Object store backed by an S3 bucket.
///
/// Credentials and region come from the standard AWS environment
/// (environment variables, shared config, instance metadata).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store for the given bucket.
    pub async fn new(bucket: &str, prefix: &str, public_base_url: &str) -> AppResult<Self> {
        if bucket.is_empty() {
            return Err(AppError::configuration("S3 bucket name is not set"));
        }
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&sdk_config);

        info!(bucket, prefix, "Initialized S3 object store");
        Ok(Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_key(&self, key: &str) -> String {
        let clean = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            clean.to_string()
        } else {
            format!("{}/{clean}", self.prefix)
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, self.object_key(key))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(bucket = %self.bucket, "S3 health check failed: {e}");
                Ok(false)
            }
        }
    }

    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<String> {
        let object_key = self.object_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .content_type(content_type)
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to upload object: {object_key}"),
                    e,
                )
            })?;

        debug!(key = %object_key, "Uploaded object to S3");
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let object_key = self.object_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete object: {object_key}"),
                    e,
                )
            })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let object_key = self.object_key(key);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                    Ok(false)
                } else {
                    Err(AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to stat object: {object_key}"),
                        e,
                    ))
                }
            }
        }
    }
}
