/// Axis-aligned face rectangle in frame pixel coordinates.
///
/// Width and height may be zero or negative after arithmetic; such a
/// region is "empty" and never covers any pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The full extent of a `width` x `height` frame.
    pub fn frame_bounds(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Rectangle intersection. Disjoint inputs yield an empty region.
    pub fn intersect(&self, other: &Region) -> Region {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return Region::default();
        }
        Region::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// True when the two rectangles share at least one pixel.
    ///
    /// Touching edges do not count as overlap.
    pub fn intersects(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && !self.intersect(other).is_empty()
    }

    /// Clips the region to a `width` x `height` frame.
    pub fn clip_to(&self, width: u32, height: u32) -> Region {
        self.intersect(&Region::frame_bounds(width, height))
    }

    /// Expands the region by `factor` of its own width (left and right)
    /// and height (top and bottom). Padding is truncated to whole pixels.
    pub fn padded(&self, factor: f64) -> Region {
        let pad_x = (self.width as f64 * factor) as i32;
        let pad_y = (self.height as f64 * factor) as i32;
        Region::new(
            self.x - pad_x,
            self.y - pad_y,
            self.width + 2 * pad_x,
            self.height + 2 * pad_y,
        )
    }

    /// Translates the region by `(dx, dy)`.
    pub fn shifted(&self, dx: i32, dy: i32) -> Region {
        Region::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}
