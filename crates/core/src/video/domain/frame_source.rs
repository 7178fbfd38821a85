use crate::shared::frame::Frame;

/// Result of polling a frame source once.
#[derive(Debug)]
pub enum FrameGrab {
    Frame(Frame),
    /// No frame ready yet; poll again after a short delay.
    Empty,
    /// The source is exhausted (end of file, closed stream).
    Ended,
}

/// Live stream of camera frames.
pub trait FrameSource: Send {
    /// Polls for the next frame. Errors are transient decode problems;
    /// callers treat them like [`FrameGrab::Empty`].
    fn grab_frame(&mut self) -> Result<FrameGrab, Box<dyn std::error::Error>>;

    /// Releases the underlying device or stream.
    fn close(&mut self);
}
