use image::{Rgb, RgbImage};

use crate::errors::{PipelineError, Result};
use crate::mask::BinaryMask;

/// Overlay tint applied to tumor regions (light green).
pub const OVERLAY_COLOR: Rgb<u8> = Rgb([144, 238, 144]);
/// Blending factor: 0 keeps the original, 1 paints the full overlay color.
pub const OVERLAY_ALPHA: f32 = 0.6;

/// Blend `color` over every masked pixel of `image` at opacity `alpha`.
///
/// Pixels outside the mask pass through unchanged, so an all-zero mask
/// returns a pixel-identical copy. Pure function: the input image is never
/// mutated.
pub fn overlay_mask(
    image: &RgbImage,
    mask: &BinaryMask,
    color: Rgb<u8>,
    alpha: f32,
) -> Result<RgbImage> {
    let (iw, ih) = image.dimensions();
    let (mw, mh) = mask.dimensions();
    if (iw, ih) != (mw, mh) {
        return Err(PipelineError::ShapeMismatch {
            image_width: iw,
            image_height: ih,
            mask_width: mw,
            mask_height: mh,
        });
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(PipelineError::Configuration {
            message: format!("overlay alpha must be in [0, 1], got {alpha}"),
        });
    }

    let mask = mask.as_array();
    let mut blended = image.clone();
    for (x, y, pixel) in blended.enumerate_pixels_mut() {
        if mask[[y as usize, x as usize]] == 0 {
            continue;
        }
        for (channel, &tint) in pixel.0.iter_mut().zip(color.0.iter()) {
            let mixed = (1.0 - alpha) * f32::from(*channel) + alpha * f32::from(tint);
            *channel = mixed.round() as u8;
        }
    }
    Ok(blended)
}
