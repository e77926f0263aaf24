//! Palette PNG encoding.
//!
//! The image is quantized with [`quantize_octree`] and written as an
//! indexed-color PNG. The bit depth is the smallest of 1, 2, 4 or 8 that
//! holds the palette, and the encoder runs with its strongest compression
//! and adaptive per-row filtering.

use png::{AdaptiveFilterType, BitDepth, ColorType, Compression, Encoder};
use tracing::debug;

use super::quantize::quantize_octree;
use super::types::{validate_rgb, EncodeDetail, EncodeError, EncodedImage};

/// Smallest PNG bit depth that can index `palette_len` entries.
fn bit_depth_for(palette_len: usize) -> BitDepth {
    match palette_len {
        0..=2 => BitDepth::One,
        3..=4 => BitDepth::Two,
        5..=16 => BitDepth::Four,
        _ => BitDepth::Eight,
    }
}

/// Pack one palette index per pixel into scanlines of `bits`-wide samples.
///
/// Each row starts on a byte boundary, most significant bits first.
fn pack_indices(indices: &[u8], width: usize, bits: usize) -> Vec<u8> {
    if bits == 8 {
        return indices.to_vec();
    }

    let per_byte = 8 / bits;
    let row_bytes = width.div_ceil(per_byte);
    let rows = if width == 0 { 0 } else { indices.len() / width };
    let mut packed = vec![0u8; row_bytes * rows];

    for (row, chunk) in indices.chunks_exact(width).enumerate() {
        let out = &mut packed[row * row_bytes..(row + 1) * row_bytes];
        for (x, &index) in chunk.iter().enumerate() {
            let shift = 8 - bits * (x % per_byte + 1);
            out[x / per_byte] |= index << shift;
        }
    }
    packed
}

/// Quantize RGB pixel data to `palette_size` colors and encode it as PNG.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `palette_size` - Maximum palette entries (1-256)
///
/// No size ceiling applies; the output is whatever the palette yields.
pub fn encode_png_quantized(
    pixels: &[u8],
    width: u32,
    height: u32,
    palette_size: u16,
) -> Result<EncodedImage, EncodeError> {
    if !(1..=256).contains(&palette_size) {
        return Err(EncodeError::InvalidPaletteSize(palette_size));
    }
    validate_rgb(pixels, width, height)?;

    let quantized = quantize_octree(pixels, palette_size);
    let palette_len = quantized.palette.len();
    let depth = bit_depth_for(palette_len);
    let data = pack_indices(&quantized.indices, width as usize, depth as usize);
    let palette: Vec<u8> = quantized.palette.iter().flatten().copied().collect();

    let mut bytes = Vec::new();
    {
        let mut encoder = Encoder::new(&mut bytes, width, height);
        encoder.set_color(ColorType::Indexed);
        encoder.set_depth(depth);
        encoder.set_palette(palette);
        encoder.set_compression(Compression::Best);
        encoder.set_adaptive_filter(AdaptiveFilterType::Adaptive);

        let mut writer = encoder.write_header().map_err(EncodeError::png)?;
        writer.write_image_data(&data).map_err(EncodeError::png)?;
        writer.finish().map_err(EncodeError::png)?;
    }

    debug!(
        "PNG {}x{}: {} colors at {} bits -> {} bytes",
        width,
        height,
        palette_len,
        depth as u8,
        bytes.len()
    );

    Ok(EncodedImage {
        bytes,
        detail: EncodeDetail::Png {
            palette_len: palette_len as u16,
        },
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::test_images::noisy;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_output_is_decodable_png(
            (width, height) in (1u32..=24, 1u32..=24),
            seed in any::<u32>(),
            palette_size in 1u16..=256,
        ) {
            let pixels = noisy(width, height, seed);
            let out = encode_png_quantized(&pixels, width, height, palette_size).unwrap();

            let img = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
            prop_assert_eq!((img.width(), img.height()), (width, height));
        }
    }
}
