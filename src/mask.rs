use image::{imageops, imageops::FilterType, GrayImage};
use ndarray::prelude::*;

use crate::errors::{PipelineError, Result};

/// A per-pixel tumor mask restricted to the values {0, 1}.
///
/// The segmentation model emits masks at its fixed working resolution; the
/// adapter resizes them back to the source image's dimensions before they
/// leave the module, so a mask handed to the compositor always aligns
/// pixel-for-pixel with the original image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    data: Array2<u8>,
}

impl BinaryMask {
    /// Threshold a probability plane into a binary mask.
    ///
    /// Strictly greater-than: a probability of exactly `threshold` maps to 0.
    pub fn from_probabilities(probabilities: ArrayView2<'_, f32>, threshold: f32) -> Self {
        Self {
            data: probabilities.mapv(|p| u8::from(p > threshold)),
        }
    }

    /// Wrap an existing array, rejecting anything outside the {0, 1} domain.
    pub fn from_array(data: Array2<u8>) -> Result<Self> {
        if let Some(&v) = data.iter().find(|&&v| v > 1) {
            return Err(PipelineError::Shape {
                expected: "mask values in {0, 1}".to_string(),
                actual: format!("value {v}"),
            });
        }
        Ok(Self { data })
    }

    /// An all-one mask, mostly useful for stubs and tests.
    pub fn filled(width: u32, height: u32) -> Self {
        Self {
            data: Array2::ones((height as usize, width as usize)),
        }
    }

    /// An all-zero mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: Array2::zeros((height as usize, width as usize)),
        }
    }

    /// (width, height) in image convention.
    pub fn dimensions(&self) -> (u32, u32) {
        let (h, w) = self.data.dim();
        (w as u32, h as u32)
    }

    pub fn as_array(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// Fraction of pixels flagged as tumor, in [0, 1].
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let set: usize = self.data.iter().map(|&v| v as usize).sum();
        set as f32 / self.data.len() as f32
    }

    /// Resize with nearest-neighbor interpolation.
    ///
    /// Nearest is the only legal filter here: anything that interpolates would
    /// manufacture fractional values and break the {0, 1} domain.
    pub fn resize_nearest(&self, width: u32, height: u32) -> Self {
        let (w, h) = self.dimensions();
        if (w, h) == (width, height) {
            return self.clone();
        }
        let raw: Vec<u8> = self.data.iter().map(|&v| v * 255).collect();
        // Buffer length matches the dimensions by construction.
        let img = GrayImage::from_raw(w, h, raw).unwrap();
        let resized = imageops::resize(&img, width, height, FilterType::Nearest);
        let data = Array2::from_shape_vec((height as usize, width as usize), resized.into_raw())
            .unwrap()
            .mapv(|v| u8::from(v > 0));
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strictly_greater_than() {
        let probs = array![[0.49_f32, 0.5], [0.51, 1.0]];
        let mask = BinaryMask::from_probabilities(probs.view(), 0.5);
        assert_eq!(mask.as_array(), array![[0_u8, 0], [1, 1]]);
    }

    #[test]
    fn from_array_rejects_values_outside_domain() {
        let err = BinaryMask::from_array(array![[0_u8, 2]]).unwrap_err();
        assert!(matches!(err, PipelineError::Shape { .. }));
        assert!(BinaryMask::from_array(array![[0_u8, 1]]).is_ok());
    }

    #[test]
    fn resize_preserves_binary_domain_and_shape() {
        let mut probs = Array2::<f32>::zeros((224, 224));
        probs.slice_mut(s![..112, ..]).fill(0.9);
        let mask = BinaryMask::from_probabilities(probs.view(), 0.5);

        let resized = mask.resize_nearest(50, 80);
        assert_eq!(resized.dimensions(), (50, 80));
        assert!(resized.as_array().iter().all(|&v| v <= 1));
        // Top half stays set, bottom half stays clear.
        assert_eq!(resized.as_array()[[0, 25]], 1);
        assert_eq!(resized.as_array()[[79, 25]], 0);
    }

    #[test]
    fn upsampling_an_all_one_mask_stays_all_one() {
        let mask = BinaryMask::filled(224, 224);
        let up = mask.resize_nearest(50, 50);
        assert_eq!(up.dimensions(), (50, 50));
        assert!(up.as_array().iter().all(|&v| v == 1));
    }

    #[test]
    fn coverage_counts_set_fraction() {
        let mask = BinaryMask::from_array(array![[1_u8, 0], [0, 0]]).unwrap();
        assert!((mask.coverage() - 0.25).abs() < 1e-6);
        assert_eq!(BinaryMask::empty(4, 4).coverage(), 0.0);
        assert_eq!(BinaryMask::filled(4, 4).coverage(), 1.0);
    }
}
