//! Pixel-level helpers shared by the live pipeline and training.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Converts a camera frame to the form used for detection, tracking and
/// recognition: single-channel luma with equalized histogram.
pub fn normalize(frame: &Frame) -> Frame {
    Frame::from_gray(equalize_histogram(&frame.to_gray_image()))
}

/// Copies the pixels under `region` into a new frame.
///
/// The region is clipped to the frame first; `None` when nothing remains.
pub fn crop(frame: &Frame, region: &Region) -> Option<Frame> {
    let clipped = region.clip_to(frame.width(), frame.height());
    if clipped.is_empty() {
        return None;
    }

    let channels = frame.channels() as usize;
    let stride = frame.width() as usize * channels;
    let x0 = clipped.x as usize * channels;
    let row_len = clipped.width as usize * channels;

    let mut data = Vec::with_capacity(row_len * clipped.height as usize);
    for row in clipped.y as usize..clipped.bottom() as usize {
        let start = row * stride + x0;
        data.extend_from_slice(&frame.data()[start..start + row_len]);
    }

    Some(Frame::new(
        data,
        clipped.width as u32,
        clipped.height as u32,
        frame.channels(),
    ))
}

/// Resizes a luma image to `size` x `size`.
pub fn resize_square(image: &GrayImage, size: u32) -> GrayImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }
    imageops::resize(image, size, size, FilterType::Triangle)
}
