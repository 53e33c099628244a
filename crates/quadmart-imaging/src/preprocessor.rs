//! Image validation and canonical preprocessing.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader};
use tracing::debug;

use quadmart_core::config::imaging::ImagingConfig;
use quadmart_core::error::AppError;
use quadmart_core::result::AppResult;
use quadmart_entity::moderation::model::ImageMeta;

use crate::quality::{analyze_quality, QualityReport};

/// Metadata declared by the uploader alongside the raw bytes.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DeclaredImageMeta {
    /// Original file name, if provided.
    pub file_name: Option<String>,
    /// Declared MIME type, if provided.
    pub content_type: Option<String>,
}

/// Result of validating an upload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    /// Whether the image may proceed into the pipeline.
    pub valid: bool,
    /// Terminal, non-retryable error when invalid.
    pub error: Option<String>,
    /// Non-fatal warnings (oversized-but-resizable, embedded metadata).
    pub warnings: Vec<String>,
    /// Metadata captured from the actual bytes, when decodable.
    pub metadata: Option<ImageMeta>,
}

impl ValidationReport {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            warnings: Vec::new(),
            metadata: None,
        }
    }
}

/// Output of canonical preprocessing.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Canonical JPEG bytes, metadata stripped, bounded dimensions.
    pub bytes: Vec<u8>,
    /// Metadata of the processed output.
    pub metadata: ImageMeta,
}

/// Validates and canonicalizes uploaded images.
///
/// Every accepted image is auto-rotated, stripped of embedded metadata
/// (EXIF, XMP) while retaining its ICC color profile, downsized to fit
/// the configured bounds, and re-encoded to JPEG at a fixed quality, so
/// downstream hashing and scoring see a deterministic encoding
/// regardless of the input format.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    config: ImagingConfig,
}

impl ImagePreprocessor {
    /// Create a new preprocessor.
    pub fn new(config: ImagingConfig) -> Self {
        Self { config }
    }

    /// Validate raw upload bytes against size, format, and dimension rules.
    ///
    /// Animated formats are always rejected. Warnings are produced for
    /// oversized-but-resizable images and for embedded metadata presence.
    pub fn validate(&self, data: &[u8], declared: &DeclaredImageMeta) -> ValidationReport {
        if data.is_empty() {
            return ValidationReport::invalid("empty upload");
        }
        if data.len() as u64 > self.config.max_bytes {
            return ValidationReport::invalid(format!(
                "image is {} bytes, limit is {}",
                data.len(),
                self.config.max_bytes
            ));
        }

        let format = match image::guess_format(data) {
            Ok(format) => format,
            Err(_) => return ValidationReport::invalid("unrecognized image format"),
        };
        if !Self::format_allowed(format) {
            return ValidationReport::invalid(format!(
                "format '{}' is not accepted (animated formats are never accepted)",
                format_name(format)
            ));
        }

        let img = match image::load_from_memory(data) {
            Ok(img) => img,
            Err(e) => {
                debug!(declared = ?declared.file_name, "Image failed to decode: {e}");
                return ValidationReport::invalid("corrupt or undecodable image data");
            }
        };

        let (width, height) = (img.width(), img.height());
        if width < self.config.min_dimension || height < self.config.min_dimension {
            return ValidationReport::invalid(format!(
                "image is {width}x{height}, minimum dimension is {}",
                self.config.min_dimension
            ));
        }

        let mut warnings = Vec::new();
        if width > self.config.max_dimension || height > self.config.max_dimension {
            warnings.push(format!(
                "image is {width}x{height} and will be downsized to fit {}",
                self.config.max_dimension
            ));
        }
        let has_exif = has_embedded_metadata(data, format);
        if has_exif {
            warnings.push("embedded metadata present; it will be stripped".to_string());
        }

        ValidationReport {
            valid: true,
            error: None,
            warnings,
            metadata: Some(ImageMeta {
                width,
                height,
                format: format_name(format).to_string(),
                size_bytes: data.len() as u64,
                has_exif,
            }),
        }
    }

    /// Canonicalize an image using the configured maximum dimension.
    pub fn preprocess(&self, data: &[u8]) -> AppResult<ProcessedImage> {
        self.preprocess_bounded(data, self.config.max_dimension)
    }

    /// Canonicalize an image with an explicit dimension bound.
    ///
    /// The durable worker passes a tighter bound than the synchronous path
    /// to keep peak memory down on constrained worker hosts.
    pub fn preprocess_bounded(&self, data: &[u8], max_dimension: u32) -> AppResult<ProcessedImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::validation(format!("unrecognized image format: {e}")))?;

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| AppError::validation(format!("failed to decode image: {e}")))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let icc_profile = decoder.icc_profile().ok().flatten();

        let mut img = DynamicImage::from_decoder(decoder)
            .map_err(|e| AppError::validation(format!("failed to decode image: {e}")))?;
        img.apply_orientation(orientation);

        if img.width() > max_dimension || img.height() > max_dimension {
            img = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        }

        // JPEG cannot carry an alpha channel; re-encoding also drops every
        // metadata segment from the source. The ICC color profile is the
        // one segment carried over, so wide-gamut photos keep their colors.
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let (width, height) = (rgb.width(), rgb.height());

        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        let mut encoder = JpegEncoder::new_with_quality(&mut cursor, self.config.jpeg_quality);
        if let Some(profile) = icc_profile {
            if encoder.set_icc_profile(profile).is_err() {
                debug!("encoder rejected the ICC profile; writing without it");
            }
        }
        rgb.write_with_encoder(encoder)
            .map_err(|e| AppError::internal(format!("failed to encode image: {e}")))?;

        Ok(ProcessedImage {
            metadata: ImageMeta {
                width,
                height,
                format: "jpeg".to_string(),
                size_bytes: bytes.len() as u64,
                has_exif: false,
            },
            bytes,
        })
    }

    /// Score the image's quality against the configured cutoff.
    pub fn analyze_quality(&self, data: &[u8]) -> QualityReport {
        analyze_quality(data, self.config.low_quality_cutoff)
    }

    fn format_allowed(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp
        )
    }
}

/// Scan for embedded metadata segments (EXIF, XMP) in the raw bytes.
fn has_embedded_metadata(data: &[u8], format: ImageFormat) -> bool {
    match format {
        ImageFormat::Jpeg => {
            contains_subslice(data, b"Exif\0\0") || contains_subslice(data, b"http://ns.adobe.com/xap/1.0/")
        }
        ImageFormat::Png => contains_subslice(data, b"eXIf") || contains_subslice(data, b"iTXt"),
        ImageFormat::WebP => contains_subslice(data, b"EXIF") || contains_subslice(data, b"XMP "),
        _ => false,
    }
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Bmp => "bmp",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn test_config() -> ImagingConfig {
        ImagingConfig {
            max_bytes: 1024 * 1024,
            min_dimension: 32,
            max_dimension: 128,
            worker_max_dimension: 64,
            jpeg_quality: 85,
            low_quality_cutoff: 0.3,
            download_timeout_seconds: 5,
        }
    }

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode");
        buf
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        })
    }

    #[test]
    fn test_undersized_image_is_invalid() {
        let pre = ImagePreprocessor::new(test_config());
        let bytes = encode_png(&gradient(16, 16));
        let report = pre.validate(&bytes, &DeclaredImageMeta::default());
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("minimum dimension"));
    }

    #[test]
    fn test_oversized_bytes_are_invalid() {
        let mut config = test_config();
        config.max_bytes = 64;
        let pre = ImagePreprocessor::new(config);
        let bytes = encode_png(&gradient(64, 64));
        let report = pre.validate(&bytes, &DeclaredImageMeta::default());
        assert!(!report.valid);
    }

    #[test]
    fn test_gif_is_always_rejected() {
        let pre = ImagePreprocessor::new(test_config());
        // GIF magic plus junk; the format is recognized before decoding.
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        let report = pre.validate(&bytes, &DeclaredImageMeta::default());
        assert!(!report.valid);
        assert!(report.error.unwrap().contains("gif"));
    }

    #[test]
    fn test_corrupt_data_is_invalid() {
        let pre = ImagePreprocessor::new(test_config());
        let report = pre.validate(b"\x89PNG\r\n\x1a\nnot really", &DeclaredImageMeta::default());
        assert!(!report.valid);
    }

    #[test]
    fn test_oversized_dimensions_warn_but_pass() {
        let pre = ImagePreprocessor::new(test_config());
        let bytes = encode_png(&gradient(200, 100));
        let report = pre.validate(&bytes, &DeclaredImageMeta::default());
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("downsized")));
    }

    #[test]
    fn test_preprocess_bounds_dimensions_and_strips_metadata() {
        let pre = ImagePreprocessor::new(test_config());
        let bytes = encode_png(&gradient(200, 100));
        let processed = pre.preprocess(&bytes).expect("preprocess");

        assert!(processed.metadata.width <= 128);
        assert!(processed.metadata.height <= 128);
        assert!(!processed.metadata.has_exif);
        assert_eq!(processed.metadata.format, "jpeg");
        assert_eq!(
            image::guess_format(&processed.bytes).expect("format"),
            ImageFormat::Jpeg
        );
        assert!(!has_embedded_metadata(&processed.bytes, ImageFormat::Jpeg));
    }

    #[test]
    fn test_preprocess_preserves_aspect_ratio() {
        let pre = ImagePreprocessor::new(test_config());
        let bytes = encode_png(&gradient(200, 100));
        let processed = pre.preprocess(&bytes).expect("preprocess");
        assert_eq!(processed.metadata.width, 128);
        assert_eq!(processed.metadata.height, 64);
    }

    #[test]
    fn test_worker_bound_is_tighter() {
        let pre = ImagePreprocessor::new(test_config());
        let bytes = encode_png(&gradient(120, 120));
        let processed = pre.preprocess_bounded(&bytes, 64).expect("preprocess");
        assert!(processed.metadata.width <= 64);
        assert!(processed.metadata.height <= 64);
    }

    #[test]
    fn test_preprocess_retains_icc_profile() {
        let pre = ImagePreprocessor::new(test_config());
        let profile = b"fake-icc-profile-payload".repeat(8);

        // Encode an input JPEG carrying an ICC profile.
        let src = DynamicImage::ImageRgb8(gradient(64, 64));
        let mut input = Vec::new();
        let mut cursor = Cursor::new(&mut input);
        let mut encoder = JpegEncoder::new_with_quality(&mut cursor, 90);
        encoder
            .set_icc_profile(profile.clone())
            .expect("jpeg encoder accepts ICC profiles");
        src.write_with_encoder(encoder).expect("encode");

        let processed = pre.preprocess(&input).expect("preprocess");

        let mut decoder = ImageReader::new(Cursor::new(&processed.bytes))
            .with_guessed_format()
            .expect("format")
            .into_decoder()
            .expect("decode");
        let out_profile = decoder.icc_profile().expect("profile read").expect("profile kept");
        assert_eq!(out_profile, profile);
    }

    #[test]
    fn test_preprocess_rejects_garbage() {
        let pre = ImagePreprocessor::new(test_config());
        assert!(pre.preprocess(b"garbage").is_err());
    }
}
