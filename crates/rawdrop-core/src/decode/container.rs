//! Structural checks on TIFF-based RAW containers.
//!
//! `rawloader` slices the file buffer with offsets read straight from the
//! IFDs. A truncated or malformed file makes it index out of bounds, and on
//! wasm32 that panic aborts the whole module instead of failing one file.
//! [`check_container`] walks the same directories the decoder walks and
//! rejects any offset, length or value it would trip over.
//!
//! Only the tags the decoder dereferences are inspected. The encrypted Sony
//! SR2 block and vendor makernotes are not validated beyond their bounds.

use tracing::debug;

use super::DecodeError;

// TIFF constants
pub(crate) const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00]; // II + 42
pub(crate) const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A]; // MM + 42

// TIFF tag IDs
pub(super) const TAG_NEW_SUBFILE_TYPE: u16 = 0x00FE;
pub(super) const TAG_IMAGE_WIDTH: u16 = 0x0100;
pub(super) const TAG_IMAGE_LENGTH: u16 = 0x0101;
pub(super) const TAG_BITS_PER_SAMPLE: u16 = 0x0102;
pub(super) const TAG_COMPRESSION: u16 = 0x0103;
pub(super) const TAG_PHOTOMETRIC: u16 = 0x0106;
pub(super) const TAG_MAKE: u16 = 0x010F;
pub(super) const TAG_MODEL: u16 = 0x0110;
pub(super) const TAG_STRIP_OFFSETS: u16 = 0x0111;
pub(super) const TAG_SAMPLES_PER_PIXEL: u16 = 0x0115;
pub(super) const TAG_STRIP_BYTE_COUNTS: u16 = 0x0117;
pub(super) const TAG_SOFTWARE: u16 = 0x0131;
pub(super) const TAG_TILE_OFFSETS: u16 = 0x0144;
pub(super) const TAG_SUB_IFDS: u16 = 0x014A;
pub(super) const TAG_SONY_OFFSET: u16 = 0x7200;
pub(super) const TAG_SONY_LENGTH: u16 = 0x7201;
pub(super) const TAG_SONY_KEY: u16 = 0x7221;
pub(super) const TAG_CFA_PATTERN: u16 = 0x828E;
pub(super) const TAG_KODAK_IFD: u16 = 0x8290;
pub(super) const TAG_EXIF_IFD: u16 = 0x8769;
pub(super) const TAG_DNG_VERSION: u16 = 0xC612;
pub(super) const TAG_LINEARIZATION: u16 = 0xC618;
pub(super) const TAG_BLACK_LEVEL: u16 = 0xC61A;
pub(super) const TAG_COLOR_MATRIX_1: u16 = 0xC621;
pub(super) const TAG_COLOR_MATRIX_2: u16 = 0xC622;
pub(super) const TAG_AS_SHOT_NEUTRAL: u16 = 0xC628;
pub(super) const TAG_DNG_PRIVATE_DATA: u16 = 0xC634;
pub(super) const TAG_ACTIVE_AREA: u16 = 0xC68D;
pub(super) const TAG_MASKED_AREAS: u16 = 0xC68E;
pub(super) const TAG_RAF_RAW_SUB_IFD: u16 = 0xF000;
pub(super) const TAG_KDC_IFD: u16 = 0xFE00;

/// Every tag the decoder parses. Entries with other tags are skipped
/// without touching their data.
const DECODER_TAGS: &[u16] = &[
    0x0081, 0x008C, 0x0096, 0x0097, 0x00A4, 0x00A7, 0x00FE, 0x0100, 0x0101, 0x0102, 0x0103,
    0x0106, 0x010F, 0x0110, 0x0111, 0x0112, 0x0115, 0x0117, 0x0118, 0x0123, 0x0131, 0x0142,
    0x0143, 0x0144, 0x014A, 0x0200, 0x0201, 0x0220, 0x02BC, 0x03FD, 0x0600, 0x090D, 0x0E80,
    0x0F00, 0x1017, 0x1018, 0x2040, 0x2FF0, 0x4001, 0x7010, 0x7200, 0x7201, 0x7221, 0x7303,
    0x7313, 0x828E, 0x8290, 0x8606, 0x8769, 0x927C, 0xA010, 0xA021, 0xA028, 0xC5D8, 0xC612,
    0xC618, 0xC61A, 0xC61D, 0xC621, 0xC622, 0xC628, 0xC634, 0xC640, 0xC68D, 0xC68E, 0xF000,
    0xF001, 0xF002, 0xF003, 0xF007, 0xF00E, 0xFA2A, 0xFD00, 0xFD01, 0xFD04, 0xFE00,
];

/// Tags whose values are offsets of nested IFDs.
const SUB_IFD_TAGS: &[u16] = &[
    TAG_SUB_IFDS,
    TAG_EXIF_IFD,
    TAG_RAF_RAW_SUB_IFD,
    TAG_KODAK_IFD,
    TAG_KDC_IFD,
];

// Compression values
const COMPRESSION_NONE: u32 = 1;
const COMPRESSION_LJPEG: u32 = 7;
const COMPRESSION_LOSSY_DNG: u32 = 0x884C;

const PHOTOMETRIC_LINEAR_RAW: u32 = 34892;

// Walk limits, matching the decoder's own
const MAX_CHAINED_IFDS: usize = 100;
const MAX_IFD_ENTRIES: u16 = 4000;
const MAX_IFD_DEPTH: u32 = 10;
const MAX_DIRECTORIES: usize = 10_000;

// Largest image the decoder will allocate
const MAX_SIDE: u64 = 50_000;
const MAX_PIXELS: u64 = 500_000_000;

/// log2 of the value size for each TIFF field type (0..=13)
const TYPE_SHIFTS: [u32; 14] = [0, 0, 0, 1, 2, 3, 0, 0, 1, 2, 3, 2, 3, 2];

fn corrupt(message: impl Into<String>) -> DecodeError {
    DecodeError::CorruptedFile(message.into())
}

/// Verify that `rawloader` can walk this file without reading out of bounds.
///
/// # Errors
///
/// - `DecodeError::InvalidFormat` - No TIFF byte-order header
/// - `DecodeError::CorruptedFile` - A directory, tag or data block does not
///   fit inside `bytes`
pub(crate) fn check_container(bytes: &[u8]) -> Result<(), DecodeError> {
    let little_endian = match bytes.get(..4) {
        Some(magic) if magic == TIFF_MAGIC_LE => true,
        Some(magic) if magic == TIFF_MAGIC_BE => false,
        _ => return Err(DecodeError::InvalidFormat),
    };
    let tiff = TiffFile {
        bytes,
        little_endian,
    };

    let ifds = tiff.directories()?;
    for ifd in &ifds {
        tiff.check_ifd(ifd)?;
    }

    if first_entry(&ifds, TAG_DNG_VERSION).is_some() {
        tiff.check_dng(&ifds)?;
    } else if let Some(make) = first_entry(&ifds, TAG_MAKE) {
        if tiff.text(make)? == "SONY" {
            tiff.check_sony(&ifds)?;
        }
    }

    debug!("Container layout checked: {} IFDs", ifds.len());
    Ok(())
}

/// A TIFF directory entry with its data location resolved.
#[derive(Debug, Clone, Copy)]
struct Entry {
    tag: u16,
    typ: u16,
    count: u64,
    data_offset: u64,
    byte_len: u64,
}

#[derive(Debug, Default)]
struct Ifd {
    entries: Vec<Entry>,
}

impl Ifd {
    fn find(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

/// First entry with `tag` in directory walk order.
fn first_entry(ifds: &[Ifd], tag: u16) -> Option<&Entry> {
    ifds.iter().find_map(|ifd| ifd.find(tag))
}

#[derive(Debug, Clone, Copy)]
struct TiffFile<'a> {
    bytes: &'a [u8],
    little_endian: bool,
}

impl<'a> TiffFile<'a> {
    fn slice(&self, offset: u64, length: u64) -> Option<&'a [u8]> {
        let end = offset.checked_add(length)?;
        if end > self.bytes.len() as u64 {
            return None;
        }
        Some(&self.bytes[offset as usize..end as usize])
    }

    fn read_u16(&self, offset: u64) -> Result<u16, DecodeError> {
        let b = self
            .slice(offset, 2)
            .ok_or_else(|| corrupt(format!("Failed to read u16 at offset {}", offset)))?;
        let b = [b[0], b[1]];
        Ok(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    fn read_u32(&self, offset: u64) -> Result<u32, DecodeError> {
        let b = self
            .slice(offset, 4)
            .ok_or_else(|| corrupt(format!("Failed to read u32 at offset {}", offset)))?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    /// IFD0 and its chain, each followed by its nested IFDs.
    fn directories(&self) -> Result<Vec<Ifd>, DecodeError> {
        let mut ifds = Vec::new();
        let mut offset = self.read_u32(4)? as u64;

        for _ in 0..MAX_CHAINED_IFDS {
            match self.walk(offset, 0, &mut ifds)? {
                Some(0) => break,
                Some(next) => offset = next,
                None => {
                    return Err(corrupt(format!(
                        "IFD at offset {} has too many entries",
                        offset
                    )))
                }
            }
        }
        Ok(ifds)
    }

    /// Parse one IFD into `out`, then its nested IFDs. Returns the next-IFD
    /// pointer, or `None` for a directory the decoder would refuse to parse.
    fn walk(&self, offset: u64, depth: u32, out: &mut Vec<Ifd>) -> Result<Option<u64>, DecodeError> {
        if out.len() >= MAX_DIRECTORIES {
            return Err(corrupt("Too many IFDs"));
        }

        let num_entries = self.read_u16(offset)?;
        if num_entries > MAX_IFD_ENTRIES {
            return Ok(None);
        }
        let next = self.read_u32(offset + 2 + num_entries as u64 * 12)? as u64;

        let mut ifd = Ifd::default();
        let mut children = Vec::new();
        for i in 0..num_entries as u64 {
            let at = offset + 2 + i * 12;
            let tag = self.read_u16(at)?;
            if !DECODER_TAGS.contains(&tag) {
                continue;
            }
            let entry = self.read_entry(at, tag)?;
            if SUB_IFD_TAGS.contains(&tag) && depth < MAX_IFD_DEPTH {
                for idx in 0..entry.count {
                    children.push(self.value(&entry, idx)? as u64);
                }
            }
            ifd.entries.push(entry);
        }

        out.push(ifd);
        for child in children {
            self.walk(child, depth + 1, out)?;
        }
        Ok(Some(next))
    }

    fn read_entry(&self, at: u64, tag: u16) -> Result<Entry, DecodeError> {
        let mut typ = self.read_u16(at + 2)?;
        // Unknown types are read as bytes
        if typ == 0 || typ > 13 {
            typ = 1;
        }
        let count = self.read_u32(at + 4)? as u64;
        let byte_len = count << TYPE_SHIFTS[typ as usize];
        let data_offset = if byte_len <= 4 {
            at + 8
        } else {
            self.read_u32(at + 8)? as u64
        };

        if self.slice(data_offset, byte_len).is_none() {
            return Err(corrupt(format!(
                "Tag 0x{:04X} data at offset {} runs past end of file",
                tag, data_offset
            )));
        }

        Ok(Entry {
            tag,
            typ,
            count,
            data_offset,
            byte_len,
        })
    }

    /// Integer value `index` of an entry, read the way the decoder reads it.
    fn value(&self, entry: &Entry, index: u64) -> Result<u32, DecodeError> {
        let width = match entry.typ {
            1 => 1,
            3 | 8 => 2,
            4 | 7 | 9 | 13 => 4,
            other => {
                return Err(corrupt(format!(
                    "Tag 0x{:04X} has non-integer type {}",
                    entry.tag, other
                )))
            }
        };
        let start = index
            .checked_mul(width)
            .filter(|start| start + width <= entry.byte_len)
            .ok_or_else(|| corrupt(format!("Tag 0x{:04X} has no value {}", entry.tag, index)))?;

        let at = entry.data_offset + start;
        match width {
            1 => self
                .slice(at, 1)
                .map(|b| b[0] as u32)
                .ok_or_else(|| corrupt(format!("Failed to read byte at offset {}", at))),
            2 => self.read_u16(at).map(u32::from),
            _ => self.read_u32(at),
        }
    }

    /// Numeric value `index` of an entry that may also be a rational.
    fn check_number(&self, entry: &Entry, index: u64) -> Result<(), DecodeError> {
        if matches!(entry.typ, 5 | 10) {
            if (index + 1) * 8 > entry.byte_len {
                return Err(corrupt(format!(
                    "Tag 0x{:04X} has no value {}",
                    entry.tag, index
                )));
            }
            return Ok(());
        }
        self.value(entry, index).map(|_| ())
    }

    /// ASCII value up to the first NUL, trimmed.
    fn text(&self, entry: &Entry) -> Result<String, DecodeError> {
        let data = self.slice(entry.data_offset, entry.byte_len).unwrap_or_default();
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..end])
            .map(|s| s.trim().to_string())
            .map_err(|_| corrupt(format!("Tag 0x{:04X} is not valid text", entry.tag)))
    }

    fn check_ifd(&self, ifd: &Ifd) -> Result<(), DecodeError> {
        for tag in [TAG_MAKE, TAG_MODEL, TAG_SOFTWARE] {
            if let Some(entry) = ifd.find(tag) {
                self.text(entry)?;
            }
        }

        if let Some(offsets) = ifd.find(TAG_STRIP_OFFSETS) {
            let counts = ifd.find(TAG_STRIP_BYTE_COUNTS);
            for i in 0..offsets.count {
                let offset = self.value(offsets, i)? as u64;
                let length = match counts {
                    Some(counts) if i < counts.count => self.value(counts, i)? as u64,
                    _ => 0,
                };
                if offset >= self.bytes.len() as u64 || self.slice(offset, length).is_none() {
                    return Err(corrupt(format!(
                        "Strip {} at offset {} ({} bytes) runs past end of file",
                        i, offset, length
                    )));
                }
            }
        }

        if let Some(offsets) = ifd.find(TAG_TILE_OFFSETS) {
            for i in 0..offsets.count {
                let offset = self.value(offsets, i)? as u64;
                if offset >= self.bytes.len() as u64 {
                    return Err(corrupt(format!(
                        "Tile {} at offset {} is past end of file",
                        i, offset
                    )));
                }
            }
        }

        if let (Some(width), Some(height)) = (ifd.find(TAG_IMAGE_WIDTH), ifd.find(TAG_IMAGE_LENGTH))
        {
            let width = self.value(width, 0)? as u64;
            let height = self.value(height, 0)? as u64;
            if width > MAX_SIDE || height > MAX_SIDE || width * height > MAX_PIXELS {
                return Err(corrupt(format!("Image size {}x{} is too large", width, height)));
            }
        }

        Ok(())
    }

    /// Sony ARW: uncompressed strip length and the SR2 private block.
    fn check_sony(&self, ifds: &[Ifd]) -> Result<(), DecodeError> {
        if let Some(raw) = ifds.iter().find(|ifd| ifd.find(TAG_STRIP_OFFSETS).is_some()) {
            let dims = (
                raw.find(TAG_IMAGE_WIDTH),
                raw.find(TAG_IMAGE_LENGTH),
                raw.find(TAG_STRIP_OFFSETS),
                raw.find(TAG_COMPRESSION),
            );
            if let (Some(width), Some(height), Some(offsets), Some(compression)) = dims {
                let width = self.value(width, 0)? as u64;
                let height = self.value(height, 0)? as u64;
                let offset = self.value(offsets, 0)? as u64;
                if self.value(compression, 0)? == COMPRESSION_NONE {
                    // 16-bit little-endian samples
                    self.require_span(offset, width * height * 2, "Sensor data")?;
                }
            }
        }

        let Some(private) = first_entry(ifds, TAG_DNG_PRIVATE_DATA) else {
            return Ok(());
        };
        if private.byte_len < 4 {
            return Err(corrupt("Private data pointer is truncated"));
        }
        let private_offset = self.read_u32(private.data_offset)? as u64;

        // The SR2 directory is always little-endian
        let sr2 = TiffFile {
            little_endian: true,
            ..*self
        };
        let mut sr2_ifds = Vec::new();
        if sr2.walk(private_offset, 0, &mut sr2_ifds)?.is_none() {
            return Ok(());
        }
        let fields = (
            first_entry(&sr2_ifds, TAG_SONY_OFFSET),
            first_entry(&sr2_ifds, TAG_SONY_LENGTH),
            first_entry(&sr2_ifds, TAG_SONY_KEY),
        );
        if let (Some(offset), Some(length), Some(key)) = fields {
            let offset = sr2.value(offset, 0)? as u64;
            let length = sr2.value(length, 0)? as u64;
            sr2.value(key, 0)?;
            // Decryption reads whole words, one past the end
            self.require_span(offset, length / 4 * 4 + 4, "Encrypted SR2 block")?;
        }
        Ok(())
    }

    /// DNG: the raw directory the decoder picks and the tags it reads from it.
    fn check_dng(&self, ifds: &[Ifd]) -> Result<(), DecodeError> {
        let mut raw = None;
        for ifd in ifds {
            let Some(compression) = ifd.find(TAG_COMPRESSION) else {
                continue;
            };
            let compression = self.value(compression, 0)?;
            let subsampled = match ifd.find(TAG_NEW_SUBFILE_TYPE) {
                Some(kind) => self.value(kind, 0)? & 1 != 0,
                None => false,
            };
            let supported = matches!(
                compression,
                COMPRESSION_NONE | COMPRESSION_LJPEG | COMPRESSION_LOSSY_DNG
            );
            if raw.is_none() && supported && !subsampled {
                raw = Some((ifd, compression));
            }
        }
        let Some((raw, compression)) = raw else {
            return Err(corrupt("DNG has no full-resolution raw image"));
        };

        let (Some(width), Some(height)) = (raw.find(TAG_IMAGE_WIDTH), raw.find(TAG_IMAGE_LENGTH))
        else {
            return Ok(());
        };
        let width = self.value(width, 0)? as u64;
        let height = self.value(height, 0)? as u64;
        let samples = match raw.find(TAG_SAMPLES_PER_PIXEL) {
            Some(spp) => self.value(spp, 0)? as u64,
            None => return Ok(()),
        };

        if compression == COMPRESSION_NONE {
            if let (Some(offsets), Some(bits)) =
                (raw.find(TAG_STRIP_OFFSETS), raw.find(TAG_BITS_PER_SAMPLE))
            {
                let offset = self.value(offsets, 0)? as u64;
                let bits = self.value(bits, 0)? as u64;
                let values = width.saturating_mul(samples).saturating_mul(height);
                if matches!(bits, 8 | 10 | 12 | 16) {
                    let length = values.saturating_mul(bits).div_ceil(8);
                    self.require_span(offset, length, "Sensor data")?;
                }
                if bits == 8 {
                    let table = first_entry(ifds, TAG_LINEARIZATION)
                        .ok_or_else(|| corrupt("8-bit DNG has no linearization table"))?;
                    self.value(table, 255)?;
                }
            }
        }

        if let Some(area) = raw.find(TAG_ACTIVE_AREA) {
            let bottom = self.value(area, 2)? as u64;
            let right = self.value(area, 3)? as u64;
            self.value(area, 0)?;
            self.value(area, 1)?;
            if right > width || bottom > height {
                return Err(corrupt(format!(
                    "Active area ends at {}x{} outside {}x{} image",
                    right, bottom, width, height
                )));
            }
        }

        let linear = match raw.find(TAG_PHOTOMETRIC) {
            Some(photometric) => self.value(photometric, 0)? == PHOTOMETRIC_LINEAR_RAW,
            None => false,
        };
        if !linear {
            if let Some(pattern) = raw.find(TAG_CFA_PATTERN) {
                if !matches!(pattern.count, 0 | 4 | 16 | 36 | 144) {
                    return Err(corrupt(format!(
                        "CFA pattern has {} cells",
                        pattern.count
                    )));
                }
                for i in 0..pattern.count {
                    if self.value(pattern, i)? > 2 {
                        return Err(corrupt("CFA pattern has an unknown color"));
                    }
                }
            }
        }

        if let Some(levels) = raw.find(TAG_BLACK_LEVEL) {
            for i in 0..levels.count.min(4) {
                self.check_number(levels, i)?;
            }
        }
        if let Some(neutral) = first_entry(ifds, TAG_AS_SHOT_NEUTRAL) {
            for i in 0..3 {
                self.check_number(neutral, i)?;
            }
        }
        let matrix = first_entry(ifds, TAG_COLOR_MATRIX_2)
            .or_else(|| first_entry(ifds, TAG_COLOR_MATRIX_1));
        if let Some(matrix) = matrix {
            for i in 0..matrix.count.min(12) {
                self.check_number(matrix, i)?;
            }
        }
        if let Some(masked) = raw.find(TAG_MASKED_AREAS) {
            for i in 0..masked.count.div_ceil(4) * 4 {
                self.value(masked, i)?;
            }
        }

        Ok(())
    }

    fn require_span(&self, offset: u64, length: u64, what: &str) -> Result<(), DecodeError> {
        if self.slice(offset, length).is_none() {
            return Err(corrupt(format!(
                "{} at offset {} needs {} bytes, file has {}",
                what,
                offset,
                length,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}
