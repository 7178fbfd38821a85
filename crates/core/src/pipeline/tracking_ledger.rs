use crate::detection::domain::face_tracker::FaceTracker;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// A face under continuous tracking between detection cycles.
pub struct TrackedFace {
    id: u64,
    label: u32,
    region: Region,
    last_name: String,
    tracker: Box<dyn FaceTracker>,
}

impl TrackedFace {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identity accepted when the track was created. Never changes.
    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Most recent display name from per-frame re-recognition.
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn set_last_name(&mut self, name: String) {
        self.last_name = name;
    }
}

/// The set of currently tracked faces.
///
/// Owned by the frame loop; never shared across threads.
#[derive(Default)]
pub struct TrackingLedger {
    faces: Vec<TrackedFace>,
    next_id: u64,
}

impl TrackingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a face whose tracker is already initialized on `region`.
    pub fn admit(
        &mut self,
        tracker: Box<dyn FaceTracker>,
        region: Region,
        label: u32,
        name: &str,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.faces.push(TrackedFace {
            id,
            label,
            region,
            last_name: name.to_string(),
            tracker,
        });
        id
    }

    /// Moves every track to its position in `frame`. Tracks whose tracker
    /// lost the target are removed once all of them have been updated.
    /// Returns the number of removed tracks.
    pub fn advance(&mut self, frame: &Frame) -> usize {
        let mut lost = vec![false; self.faces.len()];
        for (face, flag) in self.faces.iter_mut().zip(lost.iter_mut()) {
            match face.tracker.update(frame) {
                Some(region) if !region.is_empty() => face.region = region,
                _ => *flag = true,
            }
        }

        let before = self.faces.len();
        let mut flags = lost.into_iter();
        self.faces.retain(|_| !flags.next().unwrap_or(false));
        before - self.faces.len()
    }

    /// True if `region` shares any pixels with a tracked face.
    pub fn overlaps_any(&self, region: &Region) -> bool {
        self.faces.iter().any(|f| f.region.intersects(region))
    }

    pub fn faces(&self) -> &[TrackedFace] {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut [TrackedFace] {
        &mut self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
