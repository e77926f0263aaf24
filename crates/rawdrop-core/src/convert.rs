//! Single-image conversion: RAW bytes to an encoded JPEG or PNG.

use thiserror::Error;
use tracing::debug;

use crate::config::{ConversionOptions, OutputFormat};
use crate::decode::{DecodeError, DecodedImage, RawDecoder, RawLoaderDecoder};
use crate::encode::{encode_jpeg_within_limit, encode_png_quantized, EncodeError, EncodedImage};

/// Why one image could not be converted.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Encoded output together with the developed image size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub width: u32,
    pub height: u32,
    pub encoded: EncodedImage,
}

impl ConvertedImage {
    pub fn format(&self) -> OutputFormat {
        self.encoded.format()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.encoded.bytes
    }
}

/// Encode a decoded image with the format and settings in `options`.
pub fn encode_image(
    image: &DecodedImage,
    options: &ConversionOptions,
) -> Result<EncodedImage, EncodeError> {
    match options.format {
        OutputFormat::Jpeg => {
            encode_jpeg_within_limit(&image.pixels, image.width, image.height, &options.jpeg)
        }
        OutputFormat::Png => encode_png_quantized(
            &image.pixels,
            image.width,
            image.height,
            options.png.palette_size,
        ),
    }
}

/// Decode with `decoder`, then encode.
pub fn convert_with<D: RawDecoder + ?Sized>(
    decoder: &D,
    bytes: &[u8],
    options: &ConversionOptions,
) -> Result<ConvertedImage, ConvertError> {
    let image = decoder.decode(bytes)?;
    debug!("Developed {}x{} image", image.width, image.height);

    let encoded = encode_image(&image, options)?;
    Ok(ConvertedImage {
        width: image.width,
        height: image.height,
        encoded,
    })
}

/// Convert one RAW file using the built-in decoder.
///
/// # Example
/// ```ignore
/// use rawdrop_core::{convert_raw, ConversionOptions, OutputFormat};
///
/// let bytes = std::fs::read("DSC001.ARW").unwrap();
/// let out = convert_raw(&bytes, &ConversionOptions::for_format(OutputFormat::Png)).unwrap();
/// std::fs::write("DSC001.png", out.into_bytes()).unwrap();
/// ```
pub fn convert_raw(
    bytes: &[u8],
    options: &ConversionOptions,
) -> Result<ConvertedImage, ConvertError> {
    let decoder = RawLoaderDecoder::new(options.develop.clone());
    convert_with(&decoder, bytes, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EncodeDetail;
    use crate::decode::fixtures::small_dng;
    use crate::test_images::gradient;

    struct FixedDecoder(DecodedImage);

    impl RawDecoder for FixedDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            Ok(self.0.clone())
        }
    }

    fn sample() -> DecodedImage {
        DecodedImage::new(32, 24, gradient(32, 24))
    }

    #[test]
    fn test_encode_image_jpeg() {
        let out = encode_image(&sample(), &ConversionOptions::default()).unwrap();
        assert_eq!(out.format(), OutputFormat::Jpeg);
        assert_eq!(&out.bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(out.detail.quality(), Some(95));
    }

    #[test]
    fn test_encode_image_png() {
        let options = ConversionOptions::for_format(OutputFormat::Png);
        let out = encode_image(&sample(), &options).unwrap();
        assert_eq!(out.format(), OutputFormat::Png);
        assert_eq!(&out.bytes[1..4], b"PNG");
        assert!(matches!(out.detail, EncodeDetail::Png { .. }));
    }

    #[test]
    fn test_encode_image_respects_palette_size() {
        let mut options = ConversionOptions::for_format(OutputFormat::Png);
        options.png.palette_size = 4;
        let out = encode_image(&sample(), &options).unwrap();
        match out.detail {
            EncodeDetail::Png { palette_len } => assert!(palette_len <= 4),
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_convert_with_reports_dimensions() {
        let decoder = FixedDecoder(sample());
        let out = convert_with(&decoder, b"ignored", &ConversionOptions::default()).unwrap();
        assert_eq!((out.width, out.height), (32, 24));
        assert!(!out.encoded.is_empty());
    }

    #[test]
    fn test_convert_raw_garbage_is_decode_error() {
        let result = convert_raw(b"definitely not a raw file", &ConversionOptions::default());
        assert!(matches!(
            result,
            Err(ConvertError::Decode(DecodeError::InvalidFormat))
        ));
    }

    #[test]
    fn test_convert_raw_dng_to_both_formats() {
        let dng = small_dng();

        let jpeg = convert_raw(&dng, &ConversionOptions::default()).unwrap();
        assert_eq!((jpeg.width, jpeg.height), (4, 6));
        assert_eq!(&jpeg.encoded.bytes[0..2], &[0xFF, 0xD8]);

        let png = convert_raw(&dng, &ConversionOptions::for_format(OutputFormat::Png)).unwrap();
        assert_eq!((png.width, png.height), (4, 6));
        assert_eq!(&png.encoded.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_bad_decoder_output_is_encode_error() {
        let decoder = FixedDecoder(DecodedImage {
            width: 4,
            height: 4,
            pixels: vec![0; 5],
        });
        let result = convert_with(&decoder, &[], &ConversionOptions::default());
        assert!(matches!(
            result,
            Err(ConvertError::Encode(EncodeError::InvalidPixelData { .. }))
        ));
    }

    #[test]
    fn test_error_display_is_transparent() {
        let err = ConvertError::from(DecodeError::InvalidFormat);
        assert_eq!(err.to_string(), DecodeError::InvalidFormat.to_string());
    }
}
