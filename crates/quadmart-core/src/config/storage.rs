//! Permanent object storage configuration.

use serde::{Deserialize, Serialize};

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider: `"local"` or `"s3"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Root directory for the local provider.
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Public base URL prefixed onto stored object keys.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// S3 bucket name (s3 provider only).
    #[serde(default)]
    pub s3_bucket: String,
    /// Key prefix within the bucket (s3 provider only).
    #[serde(default = "default_s3_prefix")]
    pub s3_prefix: String,
    /// Upload timeout in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            local_root: default_local_root(),
            public_base_url: default_public_base_url(),
            s3_bucket: String::new(),
            s3_prefix: default_s3_prefix(),
            upload_timeout_seconds: default_upload_timeout(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_local_root() -> String {
    "./data/images".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/images".to_string()
}

fn default_s3_prefix() -> String {
    "listings".to_string()
}

fn default_upload_timeout() -> u64 {
    30
}
