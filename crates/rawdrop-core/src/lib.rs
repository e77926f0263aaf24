//! Rawdrop Core - RAW to web image conversion
//!
//! This crate converts camera RAW files (Sony ARW and other TIFF-based
//! formats) into web-friendly images: JPEG under a byte ceiling, or
//! palette-quantized PNG. Batches of uploads are converted independently and
//! collected into a single ZIP archive.
//!
//! The pipeline per file is decode → develop → encode → archive. Failures
//! are reported per item and never abort a batch.

pub mod archive;
pub mod batch;
pub mod config;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod naming;

#[cfg(test)]
mod test_images;

pub use archive::{Archive, ArchiveError, ARCHIVE_FILE_NAME};
pub use batch::{
    BatchConverter, BatchOutput, BatchReporter, ItemOutcome, ItemReport, ItemSummary,
    NullReporter, Upload,
};
pub use config::{
    ConfigError, ConversionOptions, DevelopOptions, JpegSizeLimit, OutputFormat, PngOptions,
};
pub use convert::{convert_raw, convert_with, encode_image, ConvertError, ConvertedImage};
pub use decode::{decode_raw, is_raw_file, read_metadata, DecodeError, DecodedImage};
pub use encode::{EncodeDetail, EncodeError, EncodedImage, SizeOutcome};
pub use naming::{accepts_upload, output_file_name};
