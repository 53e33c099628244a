//! # quadmart-imaging
//!
//! Pure, synchronous per-image transforms for the moderation pipeline:
//! validation, canonical preprocessing (rotate, strip metadata, downsize,
//! re-encode), perceptual hashing, and quality analysis.
//!
//! Nothing in this crate performs network or storage I/O. Async callers
//! run these transforms inside `tokio::task::spawn_blocking`.

pub mod phash;
pub mod preprocessor;
pub mod quality;

pub use phash::{hamming_distance, perceptual_hash};
pub use preprocessor::{
    DeclaredImageMeta, ImagePreprocessor, ProcessedImage, ValidationReport,
};
pub use quality::QualityReport;
