use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in frame pixel coordinates.
///
/// Detectors may report boxes that stick out of the frame; use
/// [`BoundingBox::clamp_to`] before indexing pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
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

    /// Intersection with a `frame_width` x `frame_height` frame, or `None`
    /// if the intersection is empty.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let fw = frame_width.min(i32::MAX as u32) as i32;
        let fh = frame_height.min(i32::MAX as u32) as i32;

        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.x.saturating_add(self.width).min(fw);
        let y2 = self.y.saturating_add(self.height).min(fh);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}
