use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Replays pre-computed face boxes by frame index.
///
/// Lets an external detector run ahead of time and write its results as
/// JSON, keyed by frame index:
///
/// ```json
/// { "0": [{ "x": 10, "y": 20, "width": 64, "height": 64 }], "3": [] }
/// ```
///
/// Frames without an entry have no faces.
pub struct ReplayFaceLocator {
    boxes: HashMap<usize, Vec<BoundingBox>>,
}

impl ReplayFaceLocator {
    pub fn new(boxes: HashMap<usize, Vec<BoundingBox>>) -> Self {
        Self { boxes }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read face boxes {}: {e}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let boxes: HashMap<usize, Vec<BoundingBox>> = serde_json::from_str(json)?;
        Ok(Self::new(boxes))
    }

    pub fn frames_with_faces(&self) -> usize {
        self.boxes.values().filter(|b| !b.is_empty()).count()
    }
}

impl FaceLocator for ReplayFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        Ok(self.boxes.get(&frame.index()).cloned().unwrap_or_default())
    }
}
