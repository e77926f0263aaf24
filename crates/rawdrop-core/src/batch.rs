//! Batch conversion of uploaded RAW files into one archive.
//!
//! Items are processed strictly in order. A failure at any stage is recorded
//! for that item and reported through the [`BatchReporter`]; it never stops
//! the rest of the batch.

use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{Archive, ArchiveError};
use crate::config::{ConfigError, ConversionOptions};
use crate::convert::{convert_with, ConvertError, ConvertedImage};
use crate::decode::{RawDecoder, RawLoaderDecoder};
use crate::encode::EncodeDetail;
use crate::naming::output_file_name;

/// Receives progress while a batch runs.
///
/// Implementations decide how to present it; the converter only calls these
/// hooks.
pub trait BatchReporter {
    /// Fraction of items finished, in (0.0, 1.0].
    fn report_progress(&mut self, fraction: f32);

    /// An item failed; `message` names the file and the reason.
    fn report_error(&mut self, name: &str, message: &str);

    /// An item was converted and added to the archive.
    fn report_success(&mut self, name: &str);
}

/// Reporter that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl BatchReporter for NullReporter {
    fn report_progress(&mut self, _fraction: f32) {}
    fn report_error(&mut self, _name: &str, _message: &str) {}
    fn report_success(&mut self, _name: &str) {}
}

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// What was produced for a converted item. The bytes live in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub output_name: String,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
    pub detail: EncodeDetail,
}

/// Result for one upload.
#[derive(Debug)]
pub enum ItemOutcome {
    Converted(ItemSummary),
    Failed(ConvertError),
}

#[derive(Debug)]
pub struct ItemReport {
    /// Upload name as received
    pub name: String,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn is_converted(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Converted(_))
    }

    /// User-facing failure message, `None` for converted items.
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            ItemOutcome::Failed(err) => Some(error_message(&self.name, err)),
            ItemOutcome::Converted(_) => None,
        }
    }
}

fn error_message(name: &str, err: &ConvertError) -> String {
    format!("Error processing {}: {}", name, err)
}

/// Everything a batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub archive: Archive,
    pub items: Vec<ItemReport>,
}

impl BatchOutput {
    pub fn converted_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_converted()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items.len() - self.converted_count()
    }

    /// Failed items as `(upload name, error)`.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ConvertError)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            ItemOutcome::Failed(err) => Some((item.name.as_str(), err)),
            ItemOutcome::Converted(_) => None,
        })
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(ItemReport::error_message)
            .collect()
    }

    /// Package the converted files as a ZIP.
    pub fn to_zip(&self) -> Result<Vec<u8>, ArchiveError> {
        self.archive.to_zip()
    }
}

/// Converts uploads one by one and collects the results.
///
/// Generic over the decoder so the orchestration can run without real RAW
/// files.
#[derive(Debug, Clone)]
pub struct BatchConverter<D: RawDecoder = RawLoaderDecoder> {
    decoder: D,
    options: ConversionOptions,
}

impl BatchConverter<RawLoaderDecoder> {
    pub fn new(options: ConversionOptions) -> Result<Self, ConfigError> {
        let decoder = RawLoaderDecoder::new(options.develop.clone());
        Self::with_decoder(decoder, options)
    }
}

impl<D: RawDecoder> BatchConverter<D> {
    pub fn with_decoder(decoder: D, options: ConversionOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self { decoder, options })
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert a single upload without touching any archive.
    pub fn convert_one(&self, upload: &Upload) -> Result<ConvertedImage, ConvertError> {
        convert_with(&self.decoder, &upload.bytes, &self.options)
    }

    /// Convert every upload in order.
    ///
    /// Progress is reported after each item as `(i + 1) / n`.
    pub fn run(&self, uploads: Vec<Upload>, reporter: &mut dyn BatchReporter) -> BatchOutput {
        let total = uploads.len();
        let mut output = BatchOutput::default();
        info!("Converting {} file(s) to {:?}", total, self.options.format);

        for (i, upload) in uploads.into_iter().enumerate() {
            let outcome = match self.convert_one(&upload) {
                Ok(converted) => {
                    let output_name = output_file_name(&upload.name, self.options.format);
                    let summary = ItemSummary {
                        output_name: output_name.clone(),
                        width: converted.width,
                        height: converted.height,
                        byte_len: converted.encoded.len(),
                        detail: converted.encoded.detail,
                    };
                    let replaced = output.archive.insert(output_name, converted.into_bytes());
                    if replaced.is_some() {
                        warn!(
                            "{} replaced an earlier entry named {}",
                            upload.name, summary.output_name
                        );
                    }
                    info!(
                        "Converted {} -> {} ({} bytes)",
                        upload.name, summary.output_name, summary.byte_len
                    );
                    reporter.report_success(&upload.name);
                    ItemOutcome::Converted(summary)
                }
                Err(err) => {
                    let message = error_message(&upload.name, &err);
                    warn!("{}", message);
                    reporter.report_error(&upload.name, &message);
                    ItemOutcome::Failed(err)
                }
            };

            output.items.push(ItemReport {
                name: upload.name,
                outcome,
            });
            reporter.report_progress((i + 1) as f32 / total as f32);
        }

        info!(
            "Batch finished: {} converted, {} failed",
            output.converted_count(),
            output.failed_count()
        );
        output
    }
}
