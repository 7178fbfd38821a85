use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::shared::label_font::LabelFont;
use crate::shared::region::Region;

pub const TRACKED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
pub const ADMITTED_COLOR: Rgb<u8> = Rgb([50, 205, 50]);
pub const UNKNOWN_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const BOX_THICKNESS: i32 = 2;

/// Draws face boxes and names onto the display copy of a frame.
///
/// Without a font only the boxes are drawn.
#[derive(Clone, Default)]
pub struct FrameAnnotator {
    font: Option<LabelFont>,
}

impl FrameAnnotator {
    pub fn new(font: Option<LabelFont>) -> Self {
        Self { font }
    }

    pub fn draw_tracked(&self, canvas: &mut RgbImage, region: &Region, name: &str) {
        self.draw(canvas, region, name, TRACKED_COLOR);
    }

    pub fn draw_admitted(&self, canvas: &mut RgbImage, region: &Region, name: &str) {
        self.draw(canvas, region, name, ADMITTED_COLOR);
    }

    pub fn draw_unknown(&self, canvas: &mut RgbImage, region: &Region, name: &str) {
        self.draw(canvas, region, name, UNKNOWN_COLOR);
    }

    fn draw(&self, canvas: &mut RgbImage, region: &Region, name: &str, color: Rgb<u8>) {
        let visible = region.clip_to(canvas.width(), canvas.height());
        if visible.is_empty() {
            return;
        }

        for inset in 0..BOX_THICKNESS {
            let w = visible.width - 2 * inset;
            let h = visible.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(visible.x + inset, visible.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        if let Some(font) = &self.font {
            // Above the box when there is room, otherwise just inside it.
            let above = visible.y - font.line_height();
            let y = if above >= 0 { above } else { visible.y + BOX_THICKNESS };
            font.draw(canvas, visible.x, y, name, color);
        }
    }
}
