use std::fs;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

const DEFAULT_TEXT_HEIGHT: f32 = 18.0;

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// TrueType font used to print names onto annotated frames and snapshots.
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    scale: PxScale,
}

impl LabelFont {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| format!("invalid font file '{}': {e}", path.display()))?;
        Ok(Self::new(font, DEFAULT_TEXT_HEIGHT))
    }

    /// DejaVu Sans Mono, compiled into the binary. Used whenever no font
    /// file is configured or the configured one cannot be read.
    pub fn bundled() -> Result<Self, Box<dyn std::error::Error>> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|e| format!("bundled label font is invalid: {e}"))?;
        Ok(Self::new(font, DEFAULT_TEXT_HEIGHT))
    }

    /// The configured font file, or the bundled font when it is unset or
    /// unreadable.
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = path {
            match Self::load(path) {
                Ok(font) => return Ok(font),
                Err(e) => log::warn!("Could not load font {}: {e}; using bundled font", path.display()),
            }
        }
        Self::bundled()
    }

    pub fn new(font: FontArc, height: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(height),
        }
    }

    /// Draws `text` with its top-left corner at `(x, y)` over a dark
    /// backing box so it stays legible on any background.
    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        if text.is_empty() {
            return;
        }
        let (w, h) = text_size(self.scale, &self.font, text);
        if w > 0 && h > 0 {
            draw_filled_rect_mut(image, Rect::at(x, y).of_size(w + 4, h + 4), Rgb([0, 0, 0]));
        }
        draw_text_mut(image, color, x + 2, y + 2, self.scale, &self.font, text);
    }

    /// Height in pixels of a line of label text, including the backing box.
    pub fn line_height(&self) -> i32 {
        self.scale.y.ceil() as i32 + 4
    }
}
