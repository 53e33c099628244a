//! Object store trait for permanent image storage backends.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for permanent object storage backends.
///
/// Implementations exist for the local filesystem and S3. The trait is
/// defined here in `quadmart-core` and implemented in `quadmart-storage`.
/// Uploads happen only for approved images; the returned URL is persisted
/// on the owning item listing.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store an object under the given key and return its permanent
    /// public URL.
    async fn upload(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<String>;

    /// Delete the object at the given key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether an object exists at the given key.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
