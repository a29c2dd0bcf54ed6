use crate::pipeline::match_gate::MatchOutcome;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Running counters for one orchestrator session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub running: bool,
    pub successful_recognitions: u64,
    pub total_detections: u64,
}

impl SessionStats {
    /// Committed recognitions as a percentage of all faces seen.
    pub fn success_rate(&self) -> f64 {
        if self.total_detections == 0 {
            return 0.0;
        }
        self.successful_recognitions as f64 / self.total_detections as f64 * 100.0
    }
}

/// One located face and how it was classified.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub bounds: BoundingBox,
    pub outcome: MatchOutcome,
}

/// Observer for what the orchestrator does each tick.
///
/// Purely observational: nothing a sink does feeds back into recognition
/// or enrollment.
pub trait StatsSink: Send {
    /// Called after every tick with the current counters.
    fn stats(&mut self, stats: &SessionStats);

    /// Called while recognizing with the annotated frame.
    fn frame(&mut self, _frame: &Frame, _faces: &[FaceAnnotation]) {}

    /// Called when an enrollment sample is accepted.
    fn enrollment_progress(&mut self, _name: &str, _captured: usize, _target: usize) {}

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used headless and in tests.
pub struct NullStatsSink;

impl StatsSink for NullStatsSink {
    fn stats(&mut self, _stats: &SessionStats) {}
}

/// Logs counters every `throttle_ticks` ticks and a summary at the end.
pub struct LogStatsSink {
    throttle_ticks: usize,
    ticks: usize,
    latest: SessionStats,
}

impl LogStatsSink {
    pub fn new(throttle_ticks: usize) -> Self {
        Self {
            throttle_ticks: throttle_ticks.max(1),
            ticks: 0,
            latest: SessionStats::default(),
        }
    }

    /// `None` until the first tick has been observed.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 {
            return None;
        }
        Some(format_stats(&self.latest, self.ticks))
    }
}

impl Default for LogStatsSink {
    fn default() -> Self {
        Self::new(100)
    }
}

impl StatsSink for LogStatsSink {
    fn stats(&mut self, stats: &SessionStats) {
        self.ticks += 1;
        self.latest = *stats;
        if self.ticks % self.throttle_ticks == 0 {
            log::info!("{}", format_stats(stats, self.ticks));
        }
    }

    fn frame(&mut self, frame: &Frame, faces: &[FaceAnnotation]) {
        for face in faces {
            match face.outcome.confidence() {
                Some(confidence) => log::debug!(
                    "Frame {}: {} ({confidence:.1}%) at {:?}",
                    frame.index(),
                    face.outcome.name(),
                    face.bounds
                ),
                None => log::debug!(
                    "Frame {}: {} at {:?}",
                    frame.index(),
                    face.outcome.name(),
                    face.bounds
                ),
            }
        }
    }

    fn enrollment_progress(&mut self, name: &str, captured: usize, target: usize) {
        log::info!("Captured sample {captured}/{target} for {name}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("Session summary: {text}");
        }
    }
}

fn format_stats(stats: &SessionStats, ticks: usize) -> String {
    format!(
        "{ticks} ticks, running: {}, recognitions: {}, detections: {}, success rate: {:.1}%",
        if stats.running { "yes" } else { "no" },
        stats.successful_recognitions,
        stats.total_detections,
        stats.success_rate()
    )
}
