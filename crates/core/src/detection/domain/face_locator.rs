use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Finds faces in a frame.
///
/// Box order carries no meaning. Implementations may be stateful,
/// hence `&mut self`.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
