//! Rawdrop WASM - WebAssembly bindings for rawdrop
//!
//! This crate exposes the rawdrop-core conversion pipeline to JavaScript so
//! RAW files can be converted entirely in the browser.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for results
//! - `options` - Conversion options parsed from plain JS objects
//! - `convert` - Single-file bindings (decode, metadata, convert, naming)
//! - `batch` - Batch conversion into a ZIP archive
//! - `reporter` - Progress callbacks for batch conversion
//!
//! # Usage
//!
//! ```typescript
//! import init, { convert_batch } from '@rawdrop/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const result = convert_batch(files, { format: 'jpeg' }, {
//!   onProgress: (p) => console.log(`${Math.round(p * 100)}%`),
//!   onError: (name, message) => console.warn(message),
//! });
//! console.log(`${result.converted_count} converted, ${result.failed_count} failed`);
//! ```

use wasm_bindgen::prelude::*;

mod batch;
mod convert;
mod options;
mod reporter;
mod types;

// Re-export public types
pub use batch::convert_batch;
pub use convert::{
    accepts_upload, convert_raw, decode_raw, is_raw_file, output_file_name, read_raw_metadata,
};
pub use types::{JsBatchResult, JsConvertedImage, JsDecodedImage};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    // Route panic messages to the browser console
    console_error_panic_hook::set_once();
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
