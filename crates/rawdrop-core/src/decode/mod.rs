//! RAW decoding pipeline for rawdrop.
//!
//! This module provides functionality for:
//! - Checking TIFF-based RAW containers (Sony ARW, DNG) before decoding
//! - Unpacking sensor data with `rawloader`
//! - Developing sensor data into 8-bit sRGB with `imagepipe`
//! - Reading capture metadata from EXIF
//!
//! # Architecture
//!
//! Decoding is split in two stages. [`read_raw_image`] validates the
//! container and unpacks it into a `rawloader::RawImage`; [`develop`] runs
//! that through the `imagepipe` pipeline to produce a [`DecodedImage`]. The
//! [`RawDecoder`] trait wraps both so callers can substitute a decoder.
//!
//! All operations are synchronous and single-threaded within WASM.
//!
//! # Examples
//!
//! ```ignore
//! use rawdrop_core::decode::{decode_raw, DecodedImage};
//! use rawdrop_core::DevelopOptions;
//!
//! let arw_bytes = std::fs::read("DSC001.ARW").unwrap();
//! let image = decode_raw(&arw_bytes, &DevelopOptions::default()).unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod container;
mod develop;
#[cfg(test)]
pub(crate) mod fixtures;
mod raw;
mod types;

pub use develop::develop;
pub use raw::{
    decode_raw, is_raw_file, read_metadata, read_raw_image, RawDecoder, RawLoaderDecoder,
};
pub use types::{DecodeError, DecodedImage, ImageMetadata, Orientation};
