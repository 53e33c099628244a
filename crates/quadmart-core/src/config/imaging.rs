//! Image preprocessing configuration.

use serde::{Deserialize, Serialize};

/// Image validation and preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingConfig {
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Minimum width/height in pixels.
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,
    /// Maximum width/height in pixels after preprocessing.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Maximum width/height used by the durable worker, which runs under
    /// tighter memory bounds than the synchronous path.
    #[serde(default = "default_worker_max_dimension")]
    pub worker_max_dimension: u32,
    /// JPEG quality for canonical re-encoding (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Quality score below which an image is flagged low quality.
    #[serde(default = "default_low_quality_cutoff")]
    pub low_quality_cutoff: f64,
    /// Timeout in seconds for downloading a temp image.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_seconds: u64,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            min_dimension: default_min_dimension(),
            max_dimension: default_max_dimension(),
            worker_max_dimension: default_worker_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
            low_quality_cutoff: default_low_quality_cutoff(),
            download_timeout_seconds: default_download_timeout(),
        }
    }
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_min_dimension() -> u32 {
    200
}

fn default_max_dimension() -> u32 {
    4096
}

fn default_worker_max_dimension() -> u32 {
    2048
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_low_quality_cutoff() -> f64 {
    0.3
}

fn default_download_timeout() -> u64 {
    30
}
