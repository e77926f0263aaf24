//! WASM-compatible wrapper types for conversion results.
//!
//! This module provides JavaScript-friendly types that wrap the core rawdrop types,
//! handling the conversion between Rust and JavaScript data representations.

use rawdrop_core::{
    ArchiveError, BatchOutput, ConvertedImage, DecodedImage, EncodeDetail, ARCHIVE_FILE_NAME,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// A decoded image wrapper for JavaScript.
///
/// Wraps the core `DecodedImage` and exposes its dimensions and RGB pixels,
/// for inline preview of a developed RAW file.
///
/// # Memory Management
///
/// The pixel data is stored in WASM memory. When you call `pixels()`, a copy is made
/// to JavaScript memory as a `Uint8Array`.
///
/// The `free()` method can be called to explicitly release WASM memory, but this is
/// optional as wasm-bindgen's finalizer will handle cleanup automatically.
#[wasm_bindgen]
pub struct JsDecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsDecodedImage {
    /// Get the image width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the number of bytes in the pixel buffer (width * height * 3 for RGB)
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGB pixel data as Uint8Array.
    ///
    /// Note: This creates a copy of the pixel data.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Returns the pixels expanded to RGBA, ready for `new ImageData(...)`.
    pub fn rgba_pixels(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect()
    }

    /// Explicitly free WASM memory.
    pub fn free(self) {
        // Dropping self releases the memory
    }
}

impl JsDecodedImage {
    pub(crate) fn from_decoded(img: DecodedImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            pixels: img.pixels,
        }
    }
}

/// One converted file, ready to download or render inline.
#[wasm_bindgen]
pub struct JsConvertedImage {
    file_name: String,
    mime_type: String,
    width: u32,
    height: u32,
    quality: Option<u8>,
    within_limit: bool,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
impl JsConvertedImage {
    /// Output file name, e.g. "DSC001.jpg"
    #[wasm_bindgen(getter)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    /// "image/jpeg" or "image/png", for building a `Blob`
    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// JPEG quality actually used; undefined for PNG
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> Option<u8> {
        self.quality
    }

    /// False when even the lowest JPEG quality exceeded the size ceiling
    #[wasm_bindgen(getter)]
    pub fn within_limit(&self) -> bool {
        self.within_limit
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    /// Encoded file bytes (copied to a Uint8Array)
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn free(self) {}
}

impl JsConvertedImage {
    pub(crate) fn from_converted(file_name: String, converted: ConvertedImage) -> Self {
        let detail: EncodeDetail = converted.encoded.detail;
        Self {
            file_name,
            mime_type: converted.format().mime_type().to_string(),
            width: converted.width,
            height: converted.height,
            quality: detail.quality(),
            within_limit: detail.within_limit(),
            bytes: converted.into_bytes(),
        }
    }
}

/// A failed upload as seen by JavaScript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsFailure {
    pub name: String,
    pub message: String,
}

/// Result of a batch conversion: the ZIP plus per-file failures.
#[wasm_bindgen]
pub struct JsBatchResult {
    zip: Vec<u8>,
    converted: usize,
    failures: Vec<JsFailure>,
}

#[wasm_bindgen]
impl JsBatchResult {
    /// Suggested download name for the archive
    #[wasm_bindgen(getter)]
    pub fn archive_name(&self) -> String {
        ARCHIVE_FILE_NAME.to_string()
    }

    /// Number of files in the archive's source batch that converted
    #[wasm_bindgen(getter)]
    pub fn converted_count(&self) -> usize {
        self.converted
    }

    #[wasm_bindgen(getter)]
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// ZIP archive bytes (copied to a Uint8Array)
    pub fn zip(&self) -> Vec<u8> {
        self.zip.clone()
    }

    /// Failures as an array of `{ name, message }` objects.
    pub fn failures(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.failures).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn free(self) {}
}

impl JsBatchResult {
    pub(crate) fn from_output(output: &BatchOutput) -> Result<Self, ArchiveError> {
        let failures = output
            .items
            .iter()
            .filter_map(|item| {
                item.error_message().map(|message| JsFailure {
                    name: item.name.clone(),
                    message,
                })
            })
            .collect();

        Ok(Self {
            zip: output.to_zip()?,
            converted: output.converted_count(),
            failures,
        })
    }

    #[cfg(test)]
    pub(crate) fn failure_list(&self) -> &[JsFailure] {
        &self.failures
    }
}
