use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use thiserror::Error;

/// Longest edge sent upstream.
pub const MAX_EDGE: u32 = 1280;
pub const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture is empty")]
    Empty,
    #[error("unreadable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read capture: {0}")]
    Io(#[from] std::io::Error),
}

/// Re-encode any supported still as a bounded-size RGB JPEG.
pub fn normalize_capture(bytes: &[u8]) -> Result<Vec<u8>, CaptureError> {
    if bytes.is_empty() {
        return Err(CaptureError::Empty);
    }

    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = decoded.dimensions();
    let resized = if width > MAX_EDGE || height > MAX_EDGE {
        decoded.resize(MAX_EDGE, MAX_EDGE, FilterType::Triangle)
    } else {
        decoded
    };

    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut jpeg = Vec::new();
    rgb.write_to(&mut jpeg, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
    Ok(jpeg)
}

pub fn read_capture(path: &Path) -> Result<Vec<u8>, CaptureError> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(CaptureError::Empty);
    }
    Ok(bytes)
}
