//! Image encoding pipeline for rawdrop.
//!
//! This module provides functionality for:
//! - Encoding images to JPEG, either at a fixed quality or as the highest
//!   quality that fits a byte ceiling
//! - Octree color quantization
//! - Encoding quantized images as palette PNG
//!
//! # Architecture
//!
//! Encoders take 8-bit RGB buffers as produced by the decode pipeline and
//! return an [`EncodedImage`] carrying the bytes plus an [`EncodeDetail`]
//! describing the settings actually used. All operations are synchronous,
//! deterministic and single-threaded within WASM.
//!
//! # Examples
//!
//! ```ignore
//! use rawdrop_core::encode::encode_jpeg_within_limit;
//! use rawdrop_core::JpegSizeLimit;
//!
//! let pixels = vec![128u8; 100 * 100 * 3]; // Gray image
//! let out = encode_jpeg_within_limit(&pixels, 100, 100, &JpegSizeLimit::default()).unwrap();
//! println!("Encoded {} bytes at quality {:?}", out.len(), out.detail.quality());
//! ```

mod jpeg;
mod png;
mod quantize;
mod types;

pub use jpeg::{encode_jpeg, encode_jpeg_within_limit};
pub use png::encode_png_quantized;
pub use quantize::{quantize_octree, QuantizedImage};
pub use types::{EncodeDetail, EncodeError, EncodedImage, SizeOutcome};
