//! Single-file conversion WASM bindings.
//!
//! # Functions
//!
//! - [`is_raw_file`] - Check if bytes represent a RAW file (TIFF-based)
//! - [`accepts_upload`] - Check an upload's file name (`.arw`, any case)
//! - [`output_file_name`] - Name a converted file
//! - [`decode_raw`] - Develop a RAW file to RGB for inline rendering
//! - [`read_raw_metadata`] - Read capture metadata
//! - [`convert_raw`] - Convert one RAW file to JPEG or PNG
//!
//! # Example
//!
//! ```typescript
//! import { accepts_upload, convert_raw } from '@rawdrop/wasm';
//!
//! if (accepts_upload(file.name)) {
//!   const bytes = new Uint8Array(await file.arrayBuffer());
//!   const out = convert_raw(file.name, bytes, { format: 'png' });
//!   const url = URL.createObjectURL(new Blob([out.bytes()], { type: out.mime_type }));
//! }
//! ```

use crate::options::{parse_format, parse_options};
use crate::types::{JsConvertedImage, JsDecodedImage};
use rawdrop_core::{convert, decode, naming};
use wasm_bindgen::prelude::*;

/// Check if bytes represent a RAW file (TIFF-based format).
///
/// Only the first 4 bytes are examined.
#[wasm_bindgen]
pub fn is_raw_file(bytes: &[u8]) -> bool {
    decode::is_raw_file(bytes)
}

/// Check whether an upload name has the accepted RAW extension.
#[wasm_bindgen]
pub fn accepts_upload(name: &str) -> bool {
    naming::accepts_upload(name)
}

/// Map an upload name to its converted name, e.g. "DSC001.ARW" -> "DSC001.jpg".
///
/// # Errors
///
/// Returns an error if `format` is not "jpeg", "jpg" or "png".
#[wasm_bindgen]
pub fn output_file_name(name: &str, format: &str) -> Result<String, JsValue> {
    let format = parse_format(format).map_err(|e| JsValue::from_str(&e))?;
    Ok(naming::output_file_name(name, format))
}

/// Develop a RAW file to 8-bit RGB.
///
/// Only the `develop` group of `options` is used.
///
/// # Errors
///
/// Returns an error if the options are invalid or the file cannot be decoded.
#[wasm_bindgen]
pub fn decode_raw(bytes: &[u8], options: JsValue) -> Result<JsDecodedImage, JsValue> {
    let options = parse_options(options)?;
    decode::decode_raw(bytes, &options.develop)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Read camera make/model, capture date, ISO, exposure, aperture and focal
/// length from a RAW file.
///
/// # Returns
///
/// A plain object with camelCase fields; missing values are `undefined`.
#[wasm_bindgen]
pub fn read_raw_metadata(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let metadata = decode::read_metadata(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&metadata).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert one RAW file.
///
/// # Arguments
///
/// * `name` - Upload file name, used to name the output
/// * `bytes` - RAW file bytes as a `Uint8Array`
/// * `options` - Optional conversion options object
///
/// # Errors
///
/// Returns `"Error processing {name}: {reason}"` if decoding or encoding fails.
#[wasm_bindgen]
pub fn convert_raw(name: &str, bytes: &[u8], options: JsValue) -> Result<JsConvertedImage, JsValue> {
    let options = parse_options(options)?;
    let file_name = naming::output_file_name(name, options.format);

    convert::convert_raw(bytes, &options)
        .map(|converted| JsConvertedImage::from_converted(file_name, converted))
        .map_err(|e| JsValue::from_str(&format!("Error processing {}: {}", name, e)))
}
