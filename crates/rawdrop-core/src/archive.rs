//! In-memory collection of converted files and its ZIP packaging.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name offered for the downloaded batch archive.
pub const ARCHIVE_FILE_NAME: &str = "converted_images.zip";

/// Errors raised while writing the ZIP container.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered set of `(file name, bytes)` entries with unique names.
///
/// Inserting a name that is already present replaces its bytes in place, so
/// the entry keeps its original position and the last write wins.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
    positions: HashMap<String, usize>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry, returning the replaced bytes.
    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        let name = name.into();
        match self.positions.get(&name) {
            Some(&pos) => {
                debug!("Replacing archive entry {}", name);
                Some(std::mem::replace(&mut self.entries[pos].1, bytes))
            }
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, bytes));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.positions
            .get(name)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Total payload size before compression.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|(_, bytes)| bytes.len()).sum()
    }

    /// Write all entries, DEFLATE-compressed, into a ZIP file in memory.
    pub fn to_zip(&self) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in &self.entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }

        let zip = writer.finish()?.into_inner();
        debug!(
            "Wrote archive with {} entries: {} -> {} bytes",
            self.entries.len(),
            self.total_bytes(),
            zip.len()
        );
        Ok(zip)
    }
}
