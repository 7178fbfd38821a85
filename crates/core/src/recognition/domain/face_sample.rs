use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use crate::shared::constants::CANONICAL_FACE_SIZE;
use crate::shared::frame::Frame;
use crate::shared::imaging::{crop, resize_square};
use crate::shared::region::Region;

/// Builds the classifier input for a face: crop, resize to the canonical
/// square, equalize.
///
/// Training and live recognition both go through here, so the two paths
/// can never drift apart. Returns `None` when the region does not overlap
/// the frame.
pub fn canonical_sample(frame: &Frame, region: &Region) -> Option<GrayImage> {
    let face = crop(frame, region)?;
    let resized = resize_square(&face.to_gray_image(), CANONICAL_FACE_SIZE);
    Some(equalize_histogram(&resized))
}
