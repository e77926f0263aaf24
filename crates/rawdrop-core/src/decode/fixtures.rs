//! Hand-built RAW containers and sensor images for tests.

use rawloader::{Orientation, RawImage, RawImageData, CFA};

use super::container::{
    TAG_ACTIVE_AREA, TAG_AS_SHOT_NEUTRAL, TAG_BITS_PER_SAMPLE, TAG_BLACK_LEVEL, TAG_CFA_PATTERN,
    TAG_COMPRESSION, TAG_DNG_VERSION, TAG_IMAGE_LENGTH, TAG_IMAGE_WIDTH, TAG_MAKE, TAG_MODEL,
    TAG_NEW_SUBFILE_TYPE, TAG_PHOTOMETRIC, TAG_SAMPLES_PER_PIXEL, TAG_STRIP_BYTE_COUNTS,
    TAG_STRIP_OFFSETS,
};

const TAG_ORIENTATION: u16 = 0x0112;
const TAG_WHITE_LEVEL: u16 = 0xC61D;

/// XYZ to linear sRGB (D65), the DNG fallback color matrix.
const SRGB_D65: [[f32; 3]; 4] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
    [0.0, 0.0, 0.0],
];

#[derive(Debug, Clone)]
struct Field {
    tag: u16,
    typ: u16,
    count: u32,
    data: Vec<u8>,
}

/// Little-endian single-IFD TIFF writer.
///
/// Layout: header, optional prefix block at offset 8, IFD0, out-of-line
/// field data, then the strip. Field data of four bytes or less is stored
/// inline regardless of the declared count, so tests can write arbitrary
/// offsets.
#[derive(Debug, Clone, Default)]
pub(crate) struct TiffBuilder {
    fields: Vec<Field>,
    prefix: Vec<u8>,
    strip: Option<Vec<u8>>,
}

fn padded(len: usize) -> usize {
    len + len % 2
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields of [`small_dng`], ready to be overridden.
    pub fn from_dng_fields() -> Self {
        let samples = (0..48u16).flat_map(|i| (64 + i * 80).to_le_bytes()).collect();
        Self::new()
            .long(TAG_NEW_SUBFILE_TYPE, 0)
            .long(TAG_IMAGE_WIDTH, 8)
            .long(TAG_IMAGE_LENGTH, 6)
            .short(TAG_BITS_PER_SAMPLE, 16)
            .short(TAG_COMPRESSION, 1)
            .short(TAG_PHOTOMETRIC, 32803)
            .ascii(TAG_MAKE, "Rawdrop")
            .ascii(TAG_MODEL, "Test Sensor")
            .short(TAG_ORIENTATION, 6)
            .short(TAG_SAMPLES_PER_PIXEL, 1)
            .bytes(TAG_CFA_PATTERN, &[0, 1, 1, 2])
            .bytes(TAG_DNG_VERSION, &[1, 4, 0, 0])
            .short(TAG_BLACK_LEVEL, 64)
            .short(TAG_WHITE_LEVEL, 4095)
            .rationals(TAG_AS_SHOT_NEUTRAL, &[(1, 2), (1, 1), (2, 3)])
            .longs(TAG_ACTIVE_AREA, &[1, 1, 5, 7])
            .strip(samples)
    }

    /// Set a field, replacing any earlier one with the same tag.
    pub fn field(mut self, tag: u16, typ: u16, count: u32, data: Vec<u8>) -> Self {
        self.fields.retain(|f| f.tag != tag);
        self.fields.push(Field {
            tag,
            typ,
            count,
            data,
        });
        self
    }

    pub fn short(self, tag: u16, value: u16) -> Self {
        self.shorts(tag, &[value])
    }

    pub fn shorts(self, tag: u16, values: &[u16]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.field(tag, 3, values.len() as u32, data)
    }

    pub fn long(self, tag: u16, value: u32) -> Self {
        self.longs(tag, &[value])
    }

    pub fn longs(self, tag: u16, values: &[u32]) -> Self {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.field(tag, 4, values.len() as u32, data)
    }

    pub fn bytes(self, tag: u16, values: &[u8]) -> Self {
        self.field(tag, 1, values.len() as u32, values.to_vec())
    }

    pub fn ascii(self, tag: u16, text: &str) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u32;
        self.field(tag, 2, count, data)
    }

    pub fn rationals(self, tag: u16, values: &[(u32, u32)]) -> Self {
        let data = values
            .iter()
            .flat_map(|&(num, denom)| num.to_le_bytes().into_iter().chain(denom.to_le_bytes()))
            .collect();
        self.field(tag, 5, values.len() as u32, data)
    }

    /// Bytes placed at offset 8, before IFD0.
    pub fn prefix(mut self, bytes: Vec<u8>) -> Self {
        self.prefix = bytes;
        self
    }

    /// Strip data placed last; StripOffsets and StripByteCounts point at it.
    pub fn strip(mut self, data: Vec<u8>) -> Self {
        self.strip = Some(data);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut fields = self.fields.clone();
        if let Some(strip) = &self.strip {
            fields.retain(|f| f.tag != TAG_STRIP_OFFSETS && f.tag != TAG_STRIP_BYTE_COUNTS);
            fields.push(Field {
                tag: TAG_STRIP_OFFSETS,
                typ: 4,
                count: 1,
                data: vec![0; 4],
            });
            fields.push(Field {
                tag: TAG_STRIP_BYTE_COUNTS,
                typ: 4,
                count: 1,
                data: (strip.len() as u32).to_le_bytes().to_vec(),
            });
        }
        fields.sort_by_key(|f| f.tag);

        let ifd_offset = 8 + padded(self.prefix.len());
        let data_start = ifd_offset + 2 + fields.len() * 12 + 4;
        let extra_len: usize = fields
            .iter()
            .filter(|f| f.data.len() > 4)
            .map(|f| padded(f.data.len()))
            .sum();
        let strip_offset = (data_start + extra_len) as u32;

        let mut out = vec![0x49, 0x49, 0x2A, 0x00];
        out.extend_from_slice(&(ifd_offset as u32).to_le_bytes());
        out.extend_from_slice(&self.prefix);
        out.resize(ifd_offset, 0);

        out.extend_from_slice(&(fields.len() as u16).to_le_bytes());
        let mut extra = Vec::new();
        for field in &fields {
            out.extend_from_slice(&field.tag.to_le_bytes());
            out.extend_from_slice(&field.typ.to_le_bytes());
            out.extend_from_slice(&field.count.to_le_bytes());
            if field.tag == TAG_STRIP_OFFSETS && self.strip.is_some() {
                out.extend_from_slice(&strip_offset.to_le_bytes());
            } else if field.data.len() <= 4 {
                let mut inline = field.data.clone();
                inline.resize(4, 0);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&((data_start + extra.len()) as u32).to_le_bytes());
                extra.extend_from_slice(&field.data);
                extra.resize(padded(extra.len()), 0);
            }
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&extra);
        if let Some(strip) = &self.strip {
            out.extend_from_slice(strip);
        }
        out
    }
}

/// An 8x6 16-bit RGGB DNG with a one-pixel active-area margin and
/// orientation 6 (rotate 90 clockwise). Develops to 4x6.
pub(crate) fn small_dng() -> Vec<u8> {
    TiffBuilder::from_dng_fields().build()
}

/// A decoded RGGB sensor image with a smooth gradient.
pub(crate) fn bayer_raw(width: usize, height: usize) -> RawImage {
    let data = (0..width * height)
        .map(|i| {
            let (row, col) = (i / width, i % width);
            (512 + (row * 37 + col * 91) % 3000) as u16
        })
        .collect();

    RawImage {
        make: "Rawdrop".to_string(),
        model: "Test Sensor".to_string(),
        clean_make: "Rawdrop".to_string(),
        clean_model: "Test Sensor".to_string(),
        width,
        height,
        cpp: 1,
        wb_coeffs: [2.0, 1.0, 1.5, f32::NAN],
        whitelevels: [4095; 4],
        blacklevels: [256; 4],
        xyz_to_cam: SRGB_D65,
        cfa: CFA::new("RGGB"),
        crops: [0; 4],
        blackareas: Vec::new(),
        orientation: Orientation::Normal,
        data: RawImageData::Integer(data),
    }
}
