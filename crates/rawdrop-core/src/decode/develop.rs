//! Develop step: unpacked sensor data to display-referred sRGB.
//!
//! Demosaicing, camera white balance, the camera-to-sRGB matrix, the tone
//! curve and orientation are all `imagepipe`'s default pipeline, which reads
//! its parameters from the [`RawImage`] that `rawloader` produced. This module
//! checks that the image is one the pipeline can process and repackages the
//! 8-bit result as a [`DecodedImage`].

use imagepipe::{ImageSource, Pipeline};
use rawloader::{RawImage, RawImageData};
use tracing::debug;

use super::{DecodeError, DecodedImage};
use crate::config::DevelopOptions;

/// Develop a decoded sensor image into 8-bit sRGB.
///
/// # Errors
///
/// `DecodeError::InvalidSensorData` when the sensor layout is inconsistent
/// or the pipeline rejects the image.
pub fn develop(raw: RawImage, options: &DevelopOptions) -> Result<DecodedImage, DecodeError> {
    check_raw_image(&raw)?;

    debug!(
        "Developing {} {}: {}x{} cpp={} cfa={} crops={:?} orientation={:?}",
        raw.clean_make,
        raw.clean_model,
        raw.width,
        raw.height,
        raw.cpp,
        raw.cfa.to_string(),
        raw.crops,
        raw.orientation
    );

    let mut pipeline = Pipeline::new_from_source(ImageSource::Raw(raw))
        .map_err(DecodeError::InvalidSensorData)?;
    pipeline.globals.settings.maxwidth = options.max_width;
    pipeline.globals.settings.maxheight = options.max_height;

    let output = pipeline
        .output_8bit(None)
        .map_err(DecodeError::InvalidSensorData)?;

    let width = u32::try_from(output.width)
        .map_err(|_| DecodeError::InvalidSensorData(format!("width {}", output.width)))?;
    let height = u32::try_from(output.height)
        .map_err(|_| DecodeError::InvalidSensorData(format!("height {}", output.height)))?;
    if output.data.len() != output.width * output.height * 3 {
        return Err(DecodeError::InvalidSensorData(format!(
            "pipeline returned {} bytes for {}x{}",
            output.data.len(),
            width,
            height
        )));
    }

    debug!("Developed to {}x{}", width, height);
    Ok(DecodedImage::new(width, height, output.data))
}

/// Reject sensor layouts the pipeline would index out of bounds.
pub(crate) fn check_raw_image(raw: &RawImage) -> Result<(), DecodeError> {
    let invalid = |message: String| Err(DecodeError::InvalidSensorData(message));

    if raw.cpp != 1 && raw.cpp != 3 {
        return invalid(format!("{} components per pixel", raw.cpp));
    }
    if raw.cpp == 1 && !raw.cfa.is_valid() {
        return invalid("single-component image has no CFA pattern".to_string());
    }

    let expected = raw
        .width
        .checked_mul(raw.height)
        .and_then(|n| n.checked_mul(raw.cpp))
        .filter(|&n| n > 0);
    let actual = match &raw.data {
        RawImageData::Integer(samples) => samples.len(),
        RawImageData::Float(samples) => samples.len(),
    };
    match expected {
        Some(expected) if expected == actual => {}
        _ => {
            return invalid(format!(
                "{} samples for {}x{}x{}",
                actual, raw.width, raw.height, raw.cpp
            ))
        }
    }

    let [top, right, bottom, left] = raw.crops;
    let leaves_pixels = |a: usize, b: usize, side: usize| a.checked_add(b).is_some_and(|m| m < side);
    if !leaves_pixels(left, right, raw.width) || !leaves_pixels(top, bottom, raw.height) {
        return invalid(format!(
            "crop {:?} leaves nothing of {}x{}",
            raw.crops, raw.width, raw.height
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::fixtures::bayer_raw;
    use rawloader::{Orientation, CFA};

    #[test]
    fn test_full_size_keeps_dimensions() {
        let img = develop(bayer_raw(16, 16), &DevelopOptions::default()).unwrap();
        assert_eq!((img.width, img.height), (16, 16));
        assert_eq!(img.pixels.len(), 16 * 16 * 3);
    }

    #[test]
    fn test_crop_margins_applied() {
        let mut raw = bayer_raw(16, 16);
        raw.crops = [2, 2, 2, 2];
        let img = develop(raw, &DevelopOptions::default()).unwrap();
        assert_eq!((img.width, img.height), (12, 12));
    }

    #[test]
    fn test_orientation_swaps_output() {
        let mut raw = bayer_raw(16, 8);
        raw.orientation = Orientation::Rotate90;
        let img = develop(raw, &DevelopOptions::default()).unwrap();
        assert_eq!((img.width, img.height), (8, 16));
    }

    #[test]
    fn test_max_width_bounds_output() {
        let opts = DevelopOptions {
            max_width: 8,
            ..Default::default()
        };
        let img = develop(bayer_raw(32, 16), &opts).unwrap();
        assert!(img.width <= 8);
        assert!(img.width > 0 && img.height > 0);
        assert_eq!(img.pixels.len(), img.pixel_count() * 3);
    }

    #[test]
    fn test_develop_is_deterministic() {
        let a = develop(bayer_raw(12, 10), &DevelopOptions::default()).unwrap();
        let b = develop(bayer_raw(12, 10), &DevelopOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_count_mismatch_errors() {
        let mut raw = bayer_raw(8, 8);
        raw.data = RawImageData::Integer(vec![0; 10]);
        assert!(matches!(
            develop(raw, &DevelopOptions::default()),
            Err(DecodeError::InvalidSensorData(_))
        ));
    }

    #[test]
    fn test_unsupported_cpp_errors() {
        let mut raw = bayer_raw(4, 4);
        raw.cpp = 2;
        raw.data = RawImageData::Integer(vec![0; 32]);
        assert!(matches!(
            check_raw_image(&raw),
            Err(DecodeError::InvalidSensorData(msg)) if msg.contains("2 components")
        ));
    }

    #[test]
    fn test_missing_cfa_errors() {
        let mut raw = bayer_raw(4, 4);
        raw.cfa = CFA::new("");
        assert!(check_raw_image(&raw).is_err());
    }

    #[test]
    fn test_crop_too_large_errors() {
        let mut raw = bayer_raw(8, 8);
        raw.crops = [0, 4, 0, 4];
        assert!(check_raw_image(&raw).is_err());

        raw.crops = [usize::MAX, 0, 1, 0];
        assert!(check_raw_image(&raw).is_err());
    }

    #[test]
    fn test_empty_image_errors() {
        let mut raw = bayer_raw(4, 4);
        raw.width = 0;
        raw.data = RawImageData::Integer(Vec::new());
        assert!(check_raw_image(&raw).is_err());
    }

    #[test]
    fn test_three_component_image_accepted() {
        let mut raw = bayer_raw(4, 4);
        raw.cpp = 3;
        raw.cfa = CFA::new("");
        raw.data = RawImageData::Integer(vec![1000; 4 * 4 * 3]);
        assert!(check_raw_image(&raw).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::decode::fixtures::bayer_raw;
    use proptest::prelude::*;

    proptest! {
        /// Property: a crop is accepted exactly when it leaves at least one pixel.
        #[test]
        fn prop_crop_accepted_iff_pixels_remain(
            top in 0usize..12,
            right in 0usize..12,
            bottom in 0usize..12,
            left in 0usize..12,
        ) {
            let mut raw = bayer_raw(10, 10);
            raw.crops = [top, right, bottom, left];
            let remains = left + right < 10 && top + bottom < 10;
            prop_assert_eq!(check_raw_image(&raw).is_ok(), remains);
        }
    }
}
