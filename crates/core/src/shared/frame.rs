use ndarray::{ArrayView3, ArrayViewMut3};

use crate::shared::bounding_box::BoundingBox;

/// A single camera frame: contiguous pixel bytes in row-major order.
///
/// Frames coming from a [`FrameSource`](crate::capture::domain::frame_source::FrameSource)
/// are RGB; crops keep the channel count of the frame they were cut from.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// A frame with no pixels. Sources may hand these out when the device
    /// had nothing ready; the orchestrator skips them.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies out the part of the frame covered by `bounds`.
    ///
    /// The box is clamped to the frame first; `None` when nothing of it
    /// lies inside the frame.
    pub fn crop(&self, bounds: &BoundingBox) -> Option<Frame> {
        let clamped = bounds.clamp_to(self.width, self.height)?;
        let x1 = clamped.x as usize;
        let y1 = clamped.y as usize;
        let x2 = x1 + clamped.width as usize;
        let y2 = y1 + clamped.height as usize;
        let channels = self.channels as usize;

        let src = self.as_ndarray();
        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * channels);
        for row in y1..y2 {
            for col in x1..x2 {
                for c in 0..channels {
                    data.push(src[[row, col, c]]);
                }
            }
        }

        Some(Frame::new(
            data,
            clamped.width as u32,
            clamped.height as u32,
            self.channels,
            self.index,
        ))
    }

    /// Draws an unfilled rectangle outline in place.
    ///
    /// Only the first three channels are painted; extra channels (alpha)
    /// are left untouched. Parts outside the frame are skipped.
    pub fn draw_rectangle(&mut self, bounds: &BoundingBox, color: [u8; 3], thickness: u32) {
        let Some(clamped) = bounds.clamp_to(self.width, self.height) else {
            return;
        };
        let thickness = thickness.max(1) as i32;
        let painted = (self.channels as usize).min(3);
        let (x1, y1) = (clamped.x, clamped.y);
        let (x2, y2) = (clamped.x + clamped.width, clamped.y + clamped.height);

        let mut pixels = self.as_ndarray_mut();
        for row in y1..y2 {
            for col in x1..x2 {
                let on_edge = row < y1 + thickness
                    || row >= y2 - thickness
                    || col < x1 + thickness
                    || col >= x2 - thickness;
                if !on_edge {
                    continue;
                }
                for (c, value) in color.iter().enumerate().take(painted) {
                    pixels[[row as usize, col as usize, c]] = *value;
                }
            }
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
