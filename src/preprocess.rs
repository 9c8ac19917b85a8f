use image::{imageops, imageops::FilterType, GrayImage, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

/// Input edge length of the detection model (NHWC, single channel).
pub const DETECTION_SIZE: u32 = 224;
/// Input edge length of the classification compatibility tensor (NCHW).
pub const CLASSIFICATION_SIZE: u32 = 224;
/// Working resolution of the segmentation model (NCHW, single channel).
pub const SEGMENTATION_SIZE: u32 = 224;

/// Conditionally rescale a tensor into the unit range.
///
/// Inputs arrive either as raw 8-bit intensities or already normalized; the
/// dynamic range is sniffed from the maximum so the division happens at most
/// once. An all-zero or genuinely unit-range tensor passes through untouched.
pub fn scale_to_unit<D: Dimension>(tensor: Array<f32, D>) -> Array<f32, D> {
    let max = tensor.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max > 1.0 {
        tensor / 255.0
    } else {
        tensor
    }
}

/// Luma-weighted grayscale conversion of the canonical RGB image.
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

fn gray_to_array(gray: GrayImage) -> Array2<f32> {
    let (w, h) = gray.dimensions();
    // Buffer length is fixed by the dimensions, from_shape_vec cannot fail.
    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
        .unwrap()
        .mapv(f32::from)
}

/// Prepare the detection model input: grayscale, 224x224, unit range,
/// channel-last (1, 224, 224, 1).
///
/// Triangle filtering scales its support with the ratio, so downscales
/// average source pixels instead of aliasing.
pub fn prepare_detection(image: &RgbImage) -> Array4<f32> {
    let gray = to_grayscale(image);
    let gray = imageops::resize(&gray, DETECTION_SIZE, DETECTION_SIZE, FilterType::Triangle);
    scale_to_unit(gray_to_array(gray))
        .insert_axis(Axis(2))
        .insert_axis(Axis(0))
}

/// Prepare the classification compatibility tensor: 224x224 RGB, unit range,
/// channel-first (1, 3, 224, 224).
///
/// The production pipeline never consumes this tensor; the classification
/// backend converts straight from the canonical image at native resolution
/// (see `adapters::TumorClassifier`). This path is kept for harnesses that
/// feed the model directly.
pub fn prepare_classification(image: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(
        image,
        CLASSIFICATION_SIZE,
        CLASSIFICATION_SIZE,
        FilterType::Triangle,
    );
    let chw = resized.as_ndarray3().mapv(f32::from);
    scale_to_unit(chw).insert_axis(Axis(0))
}

/// Prepare the segmentation model input: grayscale, 224x224, unit range,
/// channel-first (1, 1, 224, 224).
pub fn prepare_segmentation(image: &RgbImage) -> Array4<f32> {
    let gray = to_grayscale(image);
    let gray = imageops::resize(
        &gray,
        SEGMENTATION_SIZE,
        SEGMENTATION_SIZE,
        FilterType::Triangle,
    );
    scale_to_unit(gray_to_array(gray))
        .insert_axis(Axis(0))
        .insert_axis(Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn uniform_rgb(w: u32, h: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb([value, value, value]))
    }

    #[test]
    fn scale_to_unit_divides_eight_bit_input() {
        let raw = array![[0.0_f32, 127.5, 255.0]];
        let scaled = scale_to_unit(raw);
        assert_eq!(scaled, array![[0.0_f32, 0.5, 1.0]]);
    }

    #[test]
    fn scale_to_unit_is_idempotent() {
        let normalized = array![[0.0_f32, 0.25, 1.0]];
        let once = scale_to_unit(normalized.clone());
        assert_eq!(once, normalized);
        assert_eq!(scale_to_unit(once.clone()), once);
    }

    #[test]
    fn scale_to_unit_leaves_all_zero_input_alone() {
        let zeros = Array2::<f32>::zeros((4, 4));
        assert_eq!(scale_to_unit(zeros.clone()), zeros);
    }

    #[test]
    fn detection_tensor_is_channel_last_unit_range() {
        let tensor = prepare_detection(&uniform_rgb(100, 60, 128));
        assert_eq!(tensor.shape(), &[1, 224, 224, 1]);
        for &v in &tensor {
            assert!((0.0..=1.0).contains(&v));
        }
        // Uniform input survives filtering as a uniform plane.
        let expected = 128.0 / 255.0;
        assert!((tensor[[0, 100, 100, 0]] - expected).abs() < 1e-3);
    }

    #[test]
    fn classification_tensor_is_channel_first() {
        let tensor = prepare_classification(&uniform_rgb(50, 50, 255));
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 223, 223]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn segmentation_tensor_is_single_channel_first() {
        let tensor = prepare_segmentation(&uniform_rgb(300, 200, 0));
        assert_eq!(tensor.shape(), &[1, 1, 224, 224]);
        assert!(tensor.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn grayscale_of_gray_pixel_keeps_intensity() {
        let gray = to_grayscale(&uniform_rgb(10, 10, 77));
        assert_eq!(gray.get_pixel(5, 5).0[0], 77);
    }
}
