use std::path::Path;

use image_filter_core::shared::constants::IMAGE_EXTENSIONS;
use image_filter_core::shared::pixel_buffer::{PixelBuffer, PixelFormat};

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decodes an image file into a pixel buffer.
///
/// Images with an alpha channel load as RGBA, everything else as RGB.
pub fn load_image(path: &Path) -> Result<PixelBuffer, Box<dyn std::error::Error>> {
    let decoded = image::open(path)?;
    let buffer = if decoded.color().has_alpha() {
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        PixelBuffer::new(rgba.into_raw(), width, height, PixelFormat::Rgba8)
    } else {
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        PixelBuffer::new(rgb.into_raw(), width, height, PixelFormat::Rgb8)
    };
    Ok(buffer)
}

/// Writes a pixel buffer to an image file; the format follows the extension.
pub fn save_image(path: &Path, image: &PixelBuffer) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (width, height, data) = (image.width(), image.height(), image.data().to_vec());
    match image.format() {
        PixelFormat::Rgb8 => image::RgbImage::from_raw(width, height, data)
            .ok_or("Failed to create image from pixel data")?
            .save(path)?,
        PixelFormat::Rgba8 => image::RgbaImage::from_raw(width, height, data)
            .ok_or("Failed to create image from pixel data")?
            .save(path)?,
    }
    Ok(())
}
