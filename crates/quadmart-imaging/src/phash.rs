//! Perceptual hashing for near-duplicate detection.

use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Grid side length; the hash is `GRID * GRID` bits.
const GRID: u32 = 8;

/// Compute a perceptual hash of the image.
///
/// Reduces the image to an 8x8 grayscale grid and thresholds each cell
/// against the grid mean, producing a 64-bit hash rendered as 16 hex
/// characters. Two images whose hashes differ in few bits are
/// near-duplicates.
///
/// If the bytes cannot be decoded, falls back to a `sha256:`-prefixed
/// cryptographic content hash. The fallback has exact-match semantics
/// only; the prefix keeps the two kinds distinguishable.
pub fn perceptual_hash(data: &[u8]) -> String {
    match image::load_from_memory(data) {
        Ok(img) => {
            let small = img
                .resize_exact(GRID, GRID, FilterType::Triangle)
                .to_luma8();
            let pixels: Vec<u64> = small.pixels().map(|p| u64::from(p.0[0])).collect();
            let mean = pixels.iter().sum::<u64>() / pixels.len() as u64;

            let mut bits: u64 = 0;
            for (i, &value) in pixels.iter().enumerate() {
                if value > mean {
                    bits |= 1 << i;
                }
            }
            format!("{bits:016x}")
        }
        Err(e) => {
            debug!("Perceptual hash fell back to content hash: {e}");
            let digest = Sha256::digest(data);
            format!("sha256:{digest:x}")
        }
    }
}

/// Number of differing bits between two perceptual hashes.
///
/// Returns `None` when either hash is a content-hash fallback or the
/// hashes are not comparable.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.len() != 16 || b.len() != 16 {
        return None;
    }
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
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

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_hash_is_idempotent() {
        let bytes = encode_png(&gradient(64, 64));
        assert_eq!(perceptual_hash(&bytes), perceptual_hash(&bytes));
    }

    #[test]
    fn test_hash_is_16_hex_chars() {
        let bytes = encode_png(&gradient(32, 32));
        let hash = perceptual_hash(&bytes);
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_resized_image_is_near_duplicate() {
        let original = gradient(128, 128);
        let bytes = encode_png(&original);
        let resized = image::DynamicImage::ImageRgb8(original)
            .resize_exact(96, 96, FilterType::Triangle)
            .to_rgb8();
        let resized_bytes = encode_png(&resized);

        let distance = hamming_distance(
            &perceptual_hash(&bytes),
            &perceptual_hash(&resized_bytes),
        )
        .expect("comparable hashes");
        assert!(distance <= 8, "distance was {distance}");
    }

    #[test]
    fn test_undecodable_bytes_fall_back_to_content_hash() {
        let hash = perceptual_hash(b"definitely not an image");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash, perceptual_hash(b"definitely not an image"));
    }

    #[test]
    fn test_fallback_hashes_are_not_comparable() {
        assert_eq!(hamming_distance("sha256:aa", "0000000000000000"), None);
    }
}
