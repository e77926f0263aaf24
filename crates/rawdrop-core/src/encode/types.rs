//! Types shared by the JPEG and PNG encoders.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, OutputFormat};

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// PNG palette size outside 1..=256
    #[error("Invalid palette size: {0} (must be 1-256)")]
    InvalidPaletteSize(u16),

    /// JPEG size search bounds are unusable
    #[error("Invalid size limit: {0}")]
    InvalidLimit(#[from] ConfigError),

    /// The underlying codec failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: &'static str,
        message: String,
    },
}

impl EncodeError {
    pub(crate) fn jpeg(err: impl ToString) -> Self {
        EncodeError::EncodingFailed {
            format: "JPEG",
            message: err.to_string(),
        }
    }

    pub(crate) fn png(err: impl ToString) -> Self {
        EncodeError::EncodingFailed {
            format: "PNG",
            message: err.to_string(),
        }
    }
}

/// Check that `pixels` is a non-empty RGB8 buffer of `width * height`.
pub(crate) fn validate_rgb(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Whether a size-bounded JPEG met its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeOutcome {
    /// Encoded size is at or below the ceiling.
    WithinLimit,
    /// Even the lowest quality in range exceeded the ceiling; the output is
    /// returned anyway.
    OverLimit,
}

/// How an output was encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "camelCase")]
pub enum EncodeDetail {
    Jpeg {
        quality: u8,
        attempts: u8,
        outcome: SizeOutcome,
    },
    Png {
        palette_len: u16,
    },
}

impl EncodeDetail {
    pub fn format(&self) -> OutputFormat {
        match self {
            EncodeDetail::Jpeg { .. } => OutputFormat::Jpeg,
            EncodeDetail::Png { .. } => OutputFormat::Png,
        }
    }

    /// JPEG quality used, `None` for PNG.
    pub fn quality(&self) -> Option<u8> {
        match self {
            EncodeDetail::Jpeg { quality, .. } => Some(*quality),
            EncodeDetail::Png { .. } => None,
        }
    }

    /// False only for a JPEG that missed its size ceiling.
    pub fn within_limit(&self) -> bool {
        !matches!(
            self,
            EncodeDetail::Jpeg {
                outcome: SizeOutcome::OverLimit,
                ..
            }
        )
    }
}

/// Encoded output bytes with a description of how they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub detail: EncodeDetail,
}

impl EncodedImage {
    pub fn format(&self) -> OutputFormat {
        self.detail.format()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
