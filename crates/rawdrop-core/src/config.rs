//! Conversion settings.
//!
//! Every option struct deserializes from a partial object: missing fields
//! take their default. Field names are camelCase so the browser side can pass
//! plain JavaScript objects straight through `serde-wasm-bindgen`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default JPEG size ceiling: 5 MiB.
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
/// Lowest JPEG quality the size search will try.
pub const DEFAULT_MIN_QUALITY: u8 = 70;
/// JPEG quality the size search starts from.
pub const DEFAULT_MAX_QUALITY: u8 = 95;
/// Quality decrement between search attempts.
pub const DEFAULT_QUALITY_STEP: u8 = 5;
/// Default PNG palette size.
pub const DEFAULT_PALETTE_SIZE: u16 = 256;

/// Errors raised by [`ConversionOptions::validate`] and friends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A JPEG quality bound is outside 1..=100
    #[error("JPEG quality {0} is outside 1..=100")]
    QualityOutOfRange(u8),

    /// Quality range is inverted
    #[error("Minimum quality ({min}) is greater than maximum quality ({max})")]
    InvertedQualityRange { min: u8, max: u8 },

    /// Quality step of zero would never terminate
    #[error("Quality step must be at least 1")]
    ZeroQualityStep,

    /// Size ceiling of zero bytes
    #[error("Maximum output size must be at least 1 byte")]
    ZeroMaxBytes,

    /// Palette size outside 1..=256
    #[error("Palette size {0} is outside 1..=256")]
    PaletteSizeOutOfRange(u16),
}

/// Target encoding for converted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG bounded by [`JpegSizeLimit`].
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    /// Palette-quantized PNG.
    Png,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// MIME type of the encoded output.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    /// Parse a format name as typed by a user ("jpeg", "JPG", "png").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// Bounds for the size-limited JPEG quality search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JpegSizeLimit {
    /// Soft ceiling on the encoded size in bytes
    pub max_bytes: usize,
    /// Lowest quality tried (inclusive)
    pub min_quality: u8,
    /// First quality tried (inclusive)
    pub max_quality: u8,
    /// Decrement between attempts
    pub quality_step: u8,
}

impl Default for JpegSizeLimit {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            min_quality: DEFAULT_MIN_QUALITY,
            max_quality: DEFAULT_MAX_QUALITY,
            quality_step: DEFAULT_QUALITY_STEP,
        }
    }
}

impl JpegSizeLimit {
    /// Check that the search is well defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for q in [self.min_quality, self.max_quality] {
            if !(1..=100).contains(&q) {
                return Err(ConfigError::QualityOutOfRange(q));
            }
        }
        if self.min_quality > self.max_quality {
            return Err(ConfigError::InvertedQualityRange {
                min: self.min_quality,
                max: self.max_quality,
            });
        }
        if self.quality_step == 0 {
            return Err(ConfigError::ZeroQualityStep);
        }
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroMaxBytes);
        }
        Ok(())
    }

    /// Qualities the search visits, highest first.
    pub fn qualities(&self) -> impl Iterator<Item = u8> {
        let min = self.min_quality;
        let step = self.quality_step.max(1);
        std::iter::successors(Some(self.max_quality), move |&q| {
            q.checked_sub(step).filter(|&next| next >= min)
        })
        .filter(move |&q| q >= min)
    }
}

/// PNG conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PngOptions {
    /// Maximum number of palette entries (1..=256)
    pub palette_size: u16,
}

impl Default for PngOptions {
    fn default() -> Self {
        Self {
            palette_size: DEFAULT_PALETTE_SIZE,
        }
    }
}

impl PngOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=256).contains(&self.palette_size) {
            return Err(ConfigError::PaletteSizeOutOfRange(self.palette_size));
        }
        Ok(())
    }
}

/// Settings handed to the develop pipeline.
///
/// Demosaicing, white balance and tone mapping are owned by `imagepipe`; the
/// only knob exposed here is an optional downscale bound. Zero means full
/// resolution on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevelopOptions {
    /// Largest output width in pixels (0 = unbounded)
    pub max_width: usize,
    /// Largest output height in pixels (0 = unbounded)
    pub max_height: usize,
}

impl DevelopOptions {
    /// Develop at the sensor's full cropped resolution.
    pub fn full_size() -> Self {
        Self::default()
    }

    /// True when neither axis is bounded.
    pub fn is_full_size(&self) -> bool {
        self.max_width == 0 && self.max_height == 0
    }
}

/// Everything a conversion needs, in one deserializable bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionOptions {
    pub format: OutputFormat,
    pub jpeg: JpegSizeLimit,
    pub png: PngOptions,
    pub develop: DevelopOptions,
}

impl ConversionOptions {
    /// Options for the given format with every other setting at its default.
    pub fn for_format(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    /// Validate every nested group.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jpeg.validate()?;
        self.png.validate()
    }
}
