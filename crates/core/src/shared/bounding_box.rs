use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel units.
///
/// Boxes handed out by the detector satisfy `x >= 0`, `y >= 0`,
/// `x + width <= frame_w` and `y + height <= frame_h`. Every transformation
/// returns a new value; nothing is adjusted in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning the inclusive extents `min..=max` on each axis, with
    /// `width = max_x - min_x` (a single pixel has zero width).
    pub fn from_extents(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && self.x as i64 + self.width as i64 <= frame_w as i64
            && self.y as i64 + self.height as i64 <= frame_h as i64
    }

    /// Significant-overlap test with `self` as the already-accepted box.
    ///
    /// Compares top-left corners against half of `self`'s size, so the
    /// relation is not symmetric: `a.overlaps(&b)` can differ from
    /// `b.overlaps(&a)` when the boxes have different sizes.
    pub fn overlaps(&self, candidate: &BoundingBox) -> bool {
        ((self.x - candidate.x).abs() as f64) < self.width as f64 / 2.0
            && ((self.y - candidate.y).abs() as f64) < self.height as f64 / 2.0
    }

    /// Square box of side `max(width, height)` centred on this box,
    /// clipped to the frame.
    pub fn squared(&self, frame_w: u32, frame_h: u32) -> BoundingBox {
        let size = self.width.max(self.height);
        let (cx, cy) = self.center();
        let half = size as f64 / 2.0;

        let x = round_half_up(cx - half).max(0);
        let y = round_half_up(cy - half).max(0);

        BoundingBox {
            x,
            y,
            width: size.min(frame_w as i32 - x).max(0),
            height: size.min(frame_h as i32 - y).max(0),
        }
    }

    /// Scales the box by `factor` around its centre.
    ///
    /// Size is capped to the frame and rounded first; the top-left is then
    /// translated (never shrunk) so the rounded box stays inside.
    pub fn expand(&self, frame_w: u32, frame_h: u32, factor: f64) -> BoundingBox {
        let new_w = (self.width as f64 * factor).min(frame_w as f64);
        let new_h = (self.height as f64 * factor).min(frame_h as f64);

        let width = round_half_up(new_w).min(frame_w as i32);
        let height = round_half_up(new_h).min(frame_h as i32);

        let new_x = self.x as f64 - (new_w - self.width as f64) / 2.0;
        let new_y = self.y as f64 - (new_h - self.height as f64) / 2.0;

        BoundingBox {
            x: round_half_up(new_x).min(frame_w as i32 - width).max(0),
            y: round_half_up(new_y).min(frame_h as i32 - height).max(0),
            width,
            height,
        }
    }
}

/// Rounds to the nearest integer, halves toward positive infinity.
fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}
