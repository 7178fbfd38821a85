use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves frames with the `image` crate; the format follows the extension.
/// Luma frames stay single-channel.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let image = match frame.channels() {
            1 => DynamicImage::ImageLuma8(frame.to_gray_image()),
            _ => DynamicImage::ImageRgb8(frame.to_rgb_image()),
        };
        let image = match size {
            Some((w, h)) if (w, h) != (frame.width(), frame.height()) => {
                image.resize_exact(w, h, FilterType::Triangle)
            }
            _ => image,
        };
        image.save(path)?;
        Ok(())
    }
}
