//! # quadmart-storage
//!
//! Permanent object storage backends behind the
//! [`ObjectStore`](quadmart_core::traits::object_store::ObjectStore) trait.
//! Approved images are uploaded here; everything else never leaves the
//! temporary staging area.

use std::sync::Arc;

use quadmart_core::config::storage::StorageConfig;
use quadmart_core::error::AppError;
use quadmart_core::result::AppResult;
use quadmart_core::traits::object_store::ObjectStore;

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use local::LocalObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Build the configured object store.
pub async fn build_object_store(config: &StorageConfig) -> AppResult<Arc<dyn ObjectStore>> {
    match config.provider.as_str() {
        "local" => {
            let store =
                LocalObjectStore::new(&config.local_root, &config.public_base_url).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "s3")]
        "s3" => {
            let store = s3::S3ObjectStore::new(
                &config.s3_bucket,
                &config.s3_prefix,
                &config.public_base_url,
            )
            .await?;
            Ok(Arc::new(store))
        }
        other => Err(AppError::configuration(format!(
            "unknown storage provider: {other}"
        ))),
    }
}
