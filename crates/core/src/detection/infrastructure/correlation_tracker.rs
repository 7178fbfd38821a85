use crate::detection::domain::face_tracker::{FaceTracker, TrackerFactory};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::math::normalized_cross_correlation;

/// Longest side of the downsampled template, in samples.
const TEMPLATE_SIDE: f32 = 32.0;

/// Best match below this correlation counts as target loss.
pub const DEFAULT_MIN_CORRELATION: f32 = 0.5;

/// Share of the template replaced by the latest match on each update.
const TEMPLATE_LEARNING_RATE: f32 = 0.1;

/// Short-term visual tracker that follows a face by normalized
/// cross-correlation template matching.
///
/// The face patch captured at `init` is downsampled to a small grid of
/// luma samples. Each update searches a window of half the box size
/// around the last position (coarse pass on the sample grid, then a
/// one-pixel refinement) and moves the box to the best match.
pub struct CorrelationTracker {
    min_correlation: f32,
    region: Region,
    template: Vec<f32>,
    cols: usize,
    rows: usize,
    cell: f32,
}

impl CorrelationTracker {
    pub fn new(min_correlation: f32) -> Self {
        Self {
            min_correlation,
            region: Region::default(),
            template: Vec::new(),
            cols: 0,
            rows: 0,
            cell: 1.0,
        }
    }

    fn sample(&self, frame: &Frame, x0: i32, y0: i32) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.cols * self.rows);
        for r in 0..self.rows {
            let y = y0 + ((r as f32 + 0.5) * self.cell) as i32;
            for c in 0..self.cols {
                let x = x0 + ((c as f32 + 0.5) * self.cell) as i32;
                out.push(luma_at(frame, x, y));
            }
        }
        out
    }

    fn score(&self, frame: &Frame, x: i32, y: i32) -> f32 {
        normalized_cross_correlation(&self.template, &self.sample(frame, x, y))
    }

    /// Best-scoring top-left corner on a `step` grid within `radius` of `(cx, cy)`.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        frame: &Frame,
        cx: i32,
        cy: i32,
        radius: i32,
        step: i32,
        max_x: i32,
        max_y: i32,
    ) -> (i32, i32, f32) {
        let mut best = (cx, cy, f32::MIN);
        let mut dy = -radius;
        while dy <= radius {
            let mut dx = -radius;
            while dx <= radius {
                let x = (cx + dx).clamp(0, max_x);
                let y = (cy + dy).clamp(0, max_y);
                let s = self.score(frame, x, y);
                if s > best.2 {
                    best = (x, y, s);
                }
                dx += step;
            }
            dy += step;
        }
        best
    }
}

impl Default for CorrelationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CORRELATION)
    }
}

impl FaceTracker for CorrelationTracker {
    fn init(&mut self, frame: &Frame, region: Region) -> Result<(), Box<dyn std::error::Error>> {
        let region = region.clip_to(frame.width(), frame.height());
        if region.is_empty() {
            return Err("tracker region lies outside the frame".into());
        }

        let longest = region.width.max(region.height) as f32;
        self.cell = (longest / TEMPLATE_SIDE).max(1.0);
        self.cols = ((region.width as f32 / self.cell).round() as usize).max(1);
        self.rows = ((region.height as f32 / self.cell).round() as usize).max(1);
        self.region = region;
        self.template = self.sample(frame, region.x, region.y);
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Option<Region> {
        if self.template.is_empty() || frame.is_empty() {
            return None;
        }
        let max_x = frame.width() as i32 - self.region.width;
        let max_y = frame.height() as i32 - self.region.height;
        if max_x < 0 || max_y < 0 {
            return None;
        }

        let radius = (self.region.width.max(self.region.height) / 2).max(1);
        let step = (self.cell as i32).max(1);

        let (cx, cy, coarse) = self.search(
            frame,
            self.region.x,
            self.region.y,
            radius,
            step,
            max_x,
            max_y,
        );
        let (x, y, score) = if step > 1 {
            self.search(frame, cx, cy, step - 1, 1, max_x, max_y)
        } else {
            (cx, cy, coarse)
        };

        if score < self.min_correlation {
            return None;
        }

        let matched = self.sample(frame, x, y);
        for (t, m) in self.template.iter_mut().zip(matched) {
            *t += (m - *t) * TEMPLATE_LEARNING_RATE;
        }
        self.region = Region::new(x, y, self.region.width, self.region.height);
        Some(self.region)
    }
}

/// Creates one [`CorrelationTracker`] per tracked face.
pub struct CorrelationTrackerFactory {
    min_correlation: f32,
}

impl CorrelationTrackerFactory {
    pub fn new(min_correlation: f32) -> Self {
        Self { min_correlation }
    }
}

impl Default for CorrelationTrackerFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CORRELATION)
    }
}

impl TrackerFactory for CorrelationTrackerFactory {
    fn create(&self) -> Box<dyn FaceTracker> {
        Box::new(CorrelationTracker::new(self.min_correlation))
    }
}

fn luma_at(frame: &Frame, x: i32, y: i32) -> f32 {
    let x = x.clamp(0, frame.width() as i32 - 1) as usize;
    let y = y.clamp(0, frame.height() as i32 - 1) as usize;
    let channels = frame.channels() as usize;
    let offset = (y * frame.width() as usize + x) * channels;
    let px = &frame.data()[offset..offset + channels];
    px.iter().map(|&v| v as f32).sum::<f32>() / channels as f32
}
