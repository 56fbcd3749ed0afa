//! I/O helpers for the demo tool: decoding inputs, encoding the composite and
//! writing JSON reports.
//!
//! - `load_image`: read a PNG/JPEG/etc. into a planar RGB or gray [`Image`].
//! - `save_image`: write an [`Image`] (1 or 3 channels) to disk.
//! - `save_plane`: write a single `ImageF32` plane scaled by `scale`.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{Image, ImageF32};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk. Grayscale sources stay single-channel, everything
/// else is converted to 8-bit RGB.
pub fn load_image(path: &Path) -> Result<Image, String> {
    let decoded =
        image::open(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let (channels, w, h, raw) = match decoded {
        DynamicImage::ImageLuma8(gray) => (1, gray.width(), gray.height(), gray.into_raw()),
        other => {
            let rgb = other.into_rgb8();
            (3, rgb.width(), rgb.height(), rgb.into_raw())
        }
    };
    Image::from_interleaved_u8(w as usize, h as usize, channels, &raw)
        .map_err(|e| format!("Failed to convert {}: {e}", path.display()))
}

/// Save a 1- or 3-channel image, clamping values to `[0, 1]`.
pub fn save_image(image: &Image, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let (w, h) = (image.width() as u32, image.height() as u32);
    let raw = image.to_interleaved_u8();
    let dynamic = match image.channels() {
        1 => ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
        3 => ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
        n => return Err(format!("Cannot encode an image with {n} channels")),
    }
    .ok_or_else(|| "Failed to create image buffer".to_string())?;
    dynamic
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Save a plane as grayscale PNG after multiplying by `scale`, e.g. to
/// visualize a distance field.
pub fn save_plane(plane: &ImageF32, scale: f32, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(plane.w as u32, plane.h as u32);
    for y in 0..plane.h {
        for x in 0..plane.w {
            let v = (plane.get(x, y) * scale * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
