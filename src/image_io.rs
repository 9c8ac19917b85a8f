use std::path::Path;

use image::RgbImage;

use crate::errors::{PipelineError, Result};

/// Decode an image from disk into the canonical 3-channel RGB form.
///
/// Grayscale sources are channel-replicated and alpha channels dropped, so
/// every preprocessor downstream can assume (H, W, 3) u8 without checking the
/// source color mode. Each call is a fresh decode; nothing is cached.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| PipelineError::Decode {
        context: format!("failed to decode {}", path.display()),
        source: e,
    })?;
    Ok(img.into_rgb8())
}

/// Decode an in-memory byte buffer into canonical RGB.
///
/// Same contract as [`load_rgb`] for callers holding uploaded bytes rather
/// than a file on disk.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode {
        context: format!("failed to decode {} in-memory bytes", bytes.len()),
        source: e,
    })?;
    Ok(img.into_rgb8())
}
