use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Short-term visual tracker following one face between detection cycles.
///
/// One instance exists per tracked face. `update` returns `None` when the
/// target is lost; implementations never panic on a bad frame.
pub trait FaceTracker: Send {
    fn init(&mut self, frame: &Frame, region: Region) -> Result<(), Box<dyn std::error::Error>>;

    fn update(&mut self, frame: &Frame) -> Option<Region>;
}

/// Creates fresh tracker instances for newly admitted faces.
pub trait TrackerFactory: Send {
    fn create(&self) -> Box<dyn FaceTracker>;
}
