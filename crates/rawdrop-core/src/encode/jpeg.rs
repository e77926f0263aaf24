//! JPEG encoding, plain and size-bounded.
//!
//! [`encode_jpeg`] wraps the `image` crate's JPEG encoder at a fixed quality.
//! [`encode_jpeg_within_limit`] walks quality down from the top of a
//! [`JpegSizeLimit`] until the output fits under its byte ceiling.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use tracing::{debug, warn};

use super::types::{validate_rgb, EncodeDetail, EncodeError, EncodedImage, SizeOutcome};
use crate::config::JpegSizeLimit;

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
///
/// # Returns
///
/// JPEG-encoded bytes on success, or an error if encoding fails.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;

    // Clamp quality to valid range (1-100)
    let quality = quality.clamp(1, 100);

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(EncodeError::jpeg)?;

    Ok(buffer.into_inner())
}

/// Encode RGB pixel data to the highest-quality JPEG that fits `limit`.
///
/// Starts at `limit.max_quality` and steps down by `limit.quality_step`,
/// returning the first encoding whose size is at or below `limit.max_bytes`.
/// If no quality down to `limit.min_quality` fits, the last (lowest quality)
/// encoding is returned with [`SizeOutcome::OverLimit`]. The ceiling is a
/// soft target, never a failure.
///
/// # Errors
///
/// Returns `EncodeError::InvalidLimit` for an unusable limit, and the same
/// errors as [`encode_jpeg`] for bad pixel data.
pub fn encode_jpeg_within_limit(
    pixels: &[u8],
    width: u32,
    height: u32,
    limit: &JpegSizeLimit,
) -> Result<EncodedImage, EncodeError> {
    limit.validate()?;

    let mut last: Option<(Vec<u8>, u8, u8)> = None;
    for (attempt, quality) in limit.qualities().enumerate() {
        let attempts = (attempt + 1) as u8;
        let bytes = encode_jpeg(pixels, width, height, quality)?;
        debug!(
            "JPEG attempt {}: quality {} -> {} bytes (limit {})",
            attempts,
            quality,
            bytes.len(),
            limit.max_bytes
        );

        if bytes.len() <= limit.max_bytes {
            return Ok(EncodedImage {
                bytes,
                detail: EncodeDetail::Jpeg {
                    quality,
                    attempts,
                    outcome: SizeOutcome::WithinLimit,
                },
            });
        }
        last = Some((bytes, quality, attempts));
    }

    let (bytes, quality, attempts) = last.ok_or_else(|| EncodeError::jpeg("no quality to try"))?;
    warn!(
        "JPEG still {} bytes at minimum quality {} (limit {})",
        bytes.len(),
        quality,
        limit.max_bytes
    );
    Ok(EncodedImage {
        bytes,
        detail: EncodeDetail::Jpeg {
            quality,
            attempts,
            outcome: SizeOutcome::OverLimit,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_images::{gradient, noisy};

    fn is_jpeg(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[0..2] == [0xFF, 0xD8] && bytes[bytes.len() - 2..] == [0xFF, 0xD9]
    }

    #[test]
    fn test_encode_jpeg_basic() {
        let pixels = vec![128u8; 100 * 100 * 3];

        let jpeg_bytes = encode_jpeg(&pixels, 100, 100, 90).unwrap();
        assert!(is_jpeg(&jpeg_bytes));
    }

    #[test]
    fn test_encode_jpeg_quality_clamping() {
        let pixels = vec![128u8; 10 * 10 * 3];

        // Quality 0 should be clamped to 1
        assert!(encode_jpeg(&pixels, 10, 10, 0).is_ok());

        // Quality 255 should be clamped to 100
        assert!(encode_jpeg(&pixels, 10, 10, 255).is_ok());
    }

    #[test]
    fn test_encode_jpeg_invalid_pixel_data_short() {
        let pixels = vec![128u8; 99 * 100 * 3]; // One row short

        let result = encode_jpeg(&pixels, 100, 100, 90);
        assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })));
    }

    #[test]
    fn test_encode_jpeg_zero_width() {
        let result = encode_jpeg(&[], 0, 100, 90);
        assert!(matches!(result, Err(EncodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_encode_jpeg_small_image() {
        let pixels = vec![255, 0, 0]; // Red pixel

        let jpeg_bytes = encode_jpeg(&pixels, 1, 1, 90).unwrap();
        assert_eq!(&jpeg_bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_jpeg_gradient_size() {
        let pixels = gradient(100, 100);

        let jpeg_bytes = encode_jpeg(&pixels, 100, 100, 90).unwrap();
        assert!(jpeg_bytes.len() > 500);
        assert!(jpeg_bytes.len() < 50000);
    }

    #[test]
    fn test_within_limit_first_attempt() {
        let pixels = gradient(64, 64);

        let out = encode_jpeg_within_limit(&pixels, 64, 64, &JpegSizeLimit::default()).unwrap();
        assert_eq!(
            out.detail,
            EncodeDetail::Jpeg {
                quality: 95,
                attempts: 1,
                outcome: SizeOutcome::WithinLimit,
            }
        );
        assert_eq!(out.bytes, encode_jpeg(&pixels, 64, 64, 95).unwrap());
    }

    #[test]
    fn test_over_limit_returns_lowest_quality() {
        let pixels = noisy(64, 64, 7);
        let limit = JpegSizeLimit {
            max_bytes: 1,
            ..Default::default()
        };

        let out = encode_jpeg_within_limit(&pixels, 64, 64, &limit).unwrap();
        assert_eq!(
            out.detail,
            EncodeDetail::Jpeg {
                quality: 70,
                attempts: 6,
                outcome: SizeOutcome::OverLimit,
            }
        );
        assert!(out.len() > 1);
        assert_eq!(out.bytes, encode_jpeg(&pixels, 64, 64, 70).unwrap());
    }

    #[test]
    fn test_ceiling_between_qualities() {
        let pixels = noisy(64, 64, 11);
        let size_at = |q| encode_jpeg(&pixels, 64, 64, q).unwrap().len();

        // A ceiling exactly at the q=80 size must stop at 80 or higher
        let limit = JpegSizeLimit {
            max_bytes: size_at(80),
            ..Default::default()
        };
        let out = encode_jpeg_within_limit(&pixels, 64, 64, &limit).unwrap();
        let quality = out.detail.quality().unwrap();
        assert!(quality >= 80);
        assert!(out.len() <= limit.max_bytes);
        assert!(out.detail.within_limit());
    }

    #[test]
    fn test_sizes_monotonic_in_quality() {
        let pixels = noisy(96, 96, 3);
        let sizes: Vec<usize> = JpegSizeLimit::default()
            .qualities()
            .map(|q| encode_jpeg(&pixels, 96, 96, q).unwrap().len())
            .collect();

        // qualities() is descending, so sizes must be non-increasing
        for pair in sizes.windows(2) {
            assert!(pair[0] >= pair[1], "sizes not monotonic: {:?}", sizes);
        }
    }

    #[test]
    fn test_invalid_limit_rejected() {
        let pixels = gradient(8, 8);
        let limit = JpegSizeLimit {
            quality_step: 0,
            ..Default::default()
        };
        let result = encode_jpeg_within_limit(&pixels, 8, 8, &limit);
        assert!(matches!(result, Err(EncodeError::InvalidLimit(_))));
    }

    #[test]
    fn test_bad_pixels_fail_before_search() {
        let result = encode_jpeg_within_limit(&[0; 10], 8, 8, &JpegSizeLimit::default());
        assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
