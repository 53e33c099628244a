//! Image quality heuristics.

use tracing::debug;

/// Result of a quality analysis pass.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QualityReport {
    /// Combined quality score, 0..1.
    pub score: f64,
    /// Whether the score fell below the configured cutoff.
    pub is_low_quality: bool,
}

/// Luma variance above this is considered fully sharp.
const SHARPNESS_SATURATION: f64 = 2500.0;

/// Pixel count treated as full-resolution (roughly 1 megapixel).
const RESOLUTION_SATURATION: f64 = 1_048_576.0;

/// Bytes-per-pixel treated as fully dense encoding.
const DENSITY_SATURATION: f64 = 0.5;

/// Score an image's quality from luma variance (sharpness proxy),
/// resolution, and encoded byte density.
///
/// Fails open: undecodable input yields a mid score that does not trip
/// the low-quality flag, so a heuristic failure never blocks an upload.
pub fn analyze_quality(data: &[u8], low_quality_cutoff: f64) -> QualityReport {
    let img = match image::load_from_memory(data) {
        Ok(img) => img,
        Err(e) => {
            debug!("Quality analysis failed open: {e}");
            return QualityReport {
                score: 0.5,
                is_low_quality: false,
            };
        }
    };

    let luma = img.to_luma8();
    let (width, height) = (luma.width(), luma.height());
    let pixel_count = f64::from(width) * f64::from(height);
    if pixel_count == 0.0 {
        return QualityReport {
            score: 0.5,
            is_low_quality: false,
        };
    }

    let mean = luma.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / pixel_count;
    let variance = luma
        .pixels()
        .map(|p| {
            let d = f64::from(p.0[0]) - mean;
            d * d
        })
        .sum::<f64>()
        / pixel_count;

    let sharpness = (variance / SHARPNESS_SATURATION).min(1.0);
    let resolution = (pixel_count / RESOLUTION_SATURATION).min(1.0);
    let density = ((data.len() as f64 / pixel_count) / DENSITY_SATURATION).min(1.0);

    let score = 0.5 * sharpness + 0.3 * resolution + 0.2 * density;

    QualityReport {
        score,
        is_low_quality: score < low_quality_cutoff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode");
        buf
    }

    #[test]
    fn test_flat_image_scores_lower_than_textured() {
        let flat = encode_png(&RgbImage::from_pixel(256, 256, image::Rgb([128, 128, 128])));
        let textured = encode_png(&RgbImage::from_fn(256, 256, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        }));

        let flat_score = analyze_quality(&flat, 0.3).score;
        let textured_score = analyze_quality(&textured, 0.3).score;
        assert!(flat_score < textured_score);
    }

    #[test]
    fn test_fails_open_on_garbage() {
        let report = analyze_quality(b"not an image at all", 0.3);
        assert!(!report.is_low_quality);
    }

    #[test]
    fn test_tiny_flat_image_is_low_quality() {
        let tiny = encode_png(&RgbImage::from_pixel(16, 16, image::Rgb([100, 100, 100])));
        let report = analyze_quality(&tiny, 0.3);
        assert!(report.is_low_quality, "score was {}", report.score);
    }
}
