use crate::shared::frame::Frame;

/// Supplies camera frames one at a time.
///
/// The orchestrator owns the source exclusively between `open` and
/// `release`, and calls `release` on every path back to idle.
pub trait FrameSource: Send {
    /// Acquires the underlying device or file set.
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Returns the next frame, or `None` when nothing is available.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device. Must be safe to call when not open.
    fn release(&mut self);
}
