//! RAW file decoding via `rawloader`.
//!
//! `rawloader` parses the container and unpacks sensor samples for Sony ARW,
//! DNG and most other TIFF-based RAW formats. The container is walked by
//! [`check_container`] first so malformed files fail with an error instead
//! of a decoder panic. The unpacked image goes to [`develop`].

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use rawloader::{RawImage, RawLoaderError};
use tracing::debug;

use super::container::{check_container, TIFF_MAGIC_BE, TIFF_MAGIC_LE};
use super::develop::develop;
use super::{DecodeError, DecodedImage, ImageMetadata, Orientation};
use crate::config::DevelopOptions;

/// Source of decoded pixels for the conversion pipeline.
///
/// The batch orchestrator only needs "bytes in, RGB out"; tests substitute
/// their own implementation to exercise failure paths.
pub trait RawDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// Production decoder: `rawloader` followed by [`develop`].
#[derive(Debug, Clone, Default)]
pub struct RawLoaderDecoder {
    options: DevelopOptions,
}

impl RawLoaderDecoder {
    pub fn new(options: DevelopOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DevelopOptions {
        &self.options
    }
}

impl RawDecoder for RawLoaderDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        develop(read_raw_image(bytes)?, &self.options)
    }
}

/// Decode a RAW file into 8-bit sRGB pixels with the given develop settings.
///
/// # Errors
///
/// - `DecodeError::InvalidFormat` - Not a recognized RAW container
/// - `DecodeError::UnsupportedCamera` - Container parsed but camera unknown
/// - `DecodeError::CorruptedFile` - Truncated or malformed RAW data
/// - `DecodeError::InvalidSensorData` - Decoder output could not be developed
pub fn decode_raw(bytes: &[u8], options: &DevelopOptions) -> Result<DecodedImage, DecodeError> {
    RawLoaderDecoder::new(options.clone()).decode(bytes)
}

/// Parse a RAW file and unpack its sensor samples without developing them.
pub fn read_raw_image(bytes: &[u8]) -> Result<RawImage, DecodeError> {
    debug!("Decoding RAW image, {} bytes", bytes.len());

    check_container(bytes)?;
    let raw = rawloader::decode(&mut Cursor::new(bytes)).map_err(decode_error)?;

    debug!(
        "Decoded {} {}: {}x{} cpp={}",
        raw.clean_make, raw.clean_model, raw.width, raw.height, raw.cpp
    );
    Ok(raw)
}

/// Map a `rawloader` failure to a [`DecodeError`] with a one-line reason.
fn decode_error(err: RawLoaderError) -> DecodeError {
    let message = err.to_string();
    if message.contains("Caught a panic") {
        return DecodeError::CorruptedFile("malformed RAW data".to_string());
    }

    let reason = short_reason(&message);
    if message.contains("Couldn't find camera") || message.contains("Couldn't find a decoder") {
        DecodeError::UnsupportedCamera(reason)
    } else {
        DecodeError::CorruptedFile(reason)
    }
}

/// First line of a `rawloader` message, without the wrapper or the
/// bug-report footer.
fn short_reason(message: &str) -> String {
    let message = message.strip_prefix("RawLoaderError: ").unwrap_or(message);
    let message = message.strip_prefix('"').unwrap_or(message);
    let message = message.strip_suffix('"').unwrap_or(message);
    let line = message.lines().next().unwrap_or_default().trim_end_matches('.');
    line.strip_suffix(" mode \"\"").unwrap_or(line).trim().to_string()
}

/// Check if a file appears to be a RAW file based on its header.
///
/// This is a quick check that doesn't fully parse the file.
///
/// # Returns
///
/// `true` if the file appears to be a TIFF-based RAW format (ARW, NEF, CR2, DNG).
pub fn is_raw_file(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }

    bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE
}

/// Read capture metadata from a RAW file's EXIF block.
///
/// Missing tags are left as `None`; only an unreadable EXIF block is an error.
pub fn read_metadata(bytes: &[u8]) -> Result<ImageMetadata, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new()
        .read_from_container(&mut cursor)
        .map_err(|e| DecodeError::ExifError(e.to_string()))?;

    let text = |tag| {
        exif.get_field(tag, In::PRIMARY)
            .map(|f| f.display_value().to_string().trim_matches('"').trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let uint = |tag| {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    };
    let rational = |tag| match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Rational(values)) => values.first().map(|r| r.to_f64() as f32),
        _ => None,
    };

    let shutter_speed = match exif.get_field(Tag::ExposureTime, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Rational(values)) => values.first().map(|r| format_exposure(r.num, r.denom)),
        _ => None,
    };

    Ok(ImageMetadata {
        camera_make: text(Tag::Make),
        camera_model: text(Tag::Model),
        date_taken: text(Tag::DateTimeOriginal).or_else(|| text(Tag::DateTime)),
        iso: uint(Tag::PhotographicSensitivity),
        shutter_speed,
        aperture: rational(Tag::FNumber),
        focal_length: rational(Tag::FocalLength),
        orientation: uint(Tag::Orientation)
            .map(Orientation::from)
            .unwrap_or_default(),
    })
}

/// Format an exposure time as "1/250" below one second, "2.5" above.
fn format_exposure(num: u32, denom: u32) -> String {
    if num == 0 || denom == 0 {
        return "0".to_string();
    }
    if num < denom {
        let reciprocal = (denom as f64 / num as f64).round() as u32;
        format!("1/{}", reciprocal)
    } else {
        let seconds = num as f64 / denom as f64;
        if seconds.fract() == 0.0 {
            format!("{}", seconds as u32)
        } else {
            format!("{:.1}", seconds)
        }
    }
}
