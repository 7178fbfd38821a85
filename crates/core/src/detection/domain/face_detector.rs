use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face detection.
///
/// Receives a normalized (grayscale, equalized) frame and returns candidate
/// face rectangles in no particular order. Faces smaller than `min_size`
/// pixels on either side are not reported. Implementations may hold
/// inference sessions, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        min_size: u32,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
