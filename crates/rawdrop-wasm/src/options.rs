//! Conversion options passed from JavaScript.
//!
//! Options arrive as plain objects, e.g.
//!
//! ```typescript
//! convert_batch(files, { format: 'png', png: { paletteSize: 128 } });
//! convert_batch(files, { jpeg: { maxBytes: 2 * 1024 * 1024 } });
//! ```
//!
//! Omitted fields keep their defaults; `undefined` or `null` means all defaults.

use rawdrop_core::{ConversionOptions, OutputFormat};
use wasm_bindgen::prelude::*;

/// Deserialize and validate an optional options object.
pub(crate) fn parse_options(value: JsValue) -> Result<ConversionOptions, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(ConversionOptions::default());
    }

    let options: ConversionOptions = serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?;
    options
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(options)
}

/// Parse an output format name ("jpeg", "jpg", "png"), case-insensitively.
pub(crate) fn parse_format(name: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_name(name).ok_or_else(|| format!("Unknown output format: {}", name))
}
