use std::path::Path;

use crate::shared::frame::Frame;

/// Loads still images (training photos).
pub trait ImageReader: Send {
    /// Reads the image at `path` as a single-channel luma frame.
    fn read_gray(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
