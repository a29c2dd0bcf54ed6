use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::attendance::domain::attendance_ledger::AttendanceLedger;
use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::classifier::Label;
use crate::detection::domain::face_locator::FaceLocator;
use crate::identity::domain::identity_store::{IdentityStore, LoadOutcome};
use crate::identity::domain::model_repository::ModelRepository;
use crate::notification::domain::notifier::Notifier;
use crate::pipeline::enrollment::{Enrollment, SampleDecision};
use crate::pipeline::match_gate::MatchOutcome;
use crate::pipeline::stats_sink::{FaceAnnotation, SessionStats, StatsSink};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::clock::Clock;
use crate::shared::constants::{SAMPLES_PER_ENROLLMENT, SAMPLE_INTERVAL_MS};
use crate::shared::frame::Frame;

const MATCH_COLOR: [u8; 3] = [0, 255, 0];
const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];
const BOX_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("an enrollment is in progress")]
    Busy,
    #[error("display name must not be empty")]
    EmptyName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Recognizing,
    Enrolling,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Nothing attached; nothing happened.
    Idle,
    /// The source has nothing more to give.
    NoFrame,
    /// The source failed on this frame; later frames may still be fine.
    FrameError,
    Recognized {
        detections: usize,
        /// Names whose attendance was committed this tick.
        recorded: Vec<String>,
    },
    SampleCaptured { captured: usize, target: usize },
    SampleSkipped { faces: usize },
    SampleDeferred,
    Enrolled {
        name: String,
        label: Label,
        persisted: bool,
    },
    EnrollmentFailed { name: String, reason: String },
}

enum Pulled {
    Frame(Frame),
    Exhausted,
    Failed,
}

enum Mode {
    Idle,
    Recognizing,
    Enrolling {
        enrollment: Enrollment,
        resume_recognizing: bool,
    },
}

/// Drives recognition and enrollment one frame at a time.
///
/// The orchestrator owns the frame source while it is recognizing or
/// enrolling and releases it on every way back to idle, including drop.
/// Failures on an individual frame are logged and treated as "no match";
/// nothing that happens inside [`tick`](Self::tick) is returned as an error.
pub struct RecognitionOrchestrator {
    source: Box<dyn FrameSource>,
    locator: Box<dyn FaceLocator>,
    identities: IdentityStore,
    repository: Box<dyn ModelRepository>,
    ledger: Arc<AttendanceLedger>,
    notifier: Box<dyn Notifier>,
    sink: Box<dyn StatsSink>,
    clock: Arc<dyn Clock>,
    samples_per_enrollment: usize,
    sample_interval: Duration,
    mode: Mode,
    successful_recognitions: u64,
    total_detections: u64,
}

impl RecognitionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        locator: Box<dyn FaceLocator>,
        identities: IdentityStore,
        repository: Box<dyn ModelRepository>,
        ledger: Arc<AttendanceLedger>,
        notifier: Box<dyn Notifier>,
        sink: Box<dyn StatsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            locator,
            identities,
            repository,
            ledger,
            notifier,
            sink,
            clock,
            samples_per_enrollment: SAMPLES_PER_ENROLLMENT,
            sample_interval: Duration::from_millis(SAMPLE_INTERVAL_MS),
            mode: Mode::Idle,
            successful_recognitions: 0,
            total_detections: 0,
        }
    }

    /// Overrides the sample count and pacing used by later enrollments.
    pub fn with_enrollment_settings(mut self, samples: usize, interval: Duration) -> Self {
        self.samples_per_enrollment = samples.max(1);
        self.sample_interval = interval;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        match self.mode {
            Mode::Idle => OrchestratorState::Idle,
            Mode::Recognizing => OrchestratorState::Recognizing,
            Mode::Enrolling { .. } => OrchestratorState::Enrolling,
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            running: matches!(self.mode, Mode::Recognizing),
            successful_recognitions: self.successful_recognitions,
            total_detections: self.total_detections,
        }
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn ledger(&self) -> &Arc<AttendanceLedger> {
        &self.ledger
    }

    /// `(captured, target)` while enrolling.
    pub fn enrollment_progress(&self) -> Option<(usize, usize)> {
        match &self.mode {
            Mode::Enrolling { enrollment, .. } => Some((enrollment.captured(), enrollment.target())),
            _ => None,
        }
    }

    /// Reloads enrolled identities from the model repository.
    pub fn load_model(&mut self) -> LoadOutcome {
        let outcome = self.identities.load(self.repository.as_ref());
        match outcome {
            LoadOutcome::Loaded { identities } => {
                log::info!("Recognition model loaded ({identities} identities)")
            }
            LoadOutcome::NotFound => log::info!("No recognition model found, starting empty"),
        }
        outcome
    }

    /// Idle → Recognizing. Already recognizing is a no-op.
    pub fn start(&mut self) -> Result<(), OrchestratorError> {
        match self.mode {
            Mode::Recognizing => return Ok(()),
            Mode::Enrolling { .. } => return Err(OrchestratorError::Busy),
            Mode::Idle => {}
        }
        self.open_source()?;
        self.mode = Mode::Recognizing;
        log::info!("Recognition started");
        Ok(())
    }

    /// Back to Idle from any state, dropping an unfinished enrollment.
    pub fn stop(&mut self) {
        if matches!(self.mode, Mode::Idle) {
            return;
        }
        if let Mode::Enrolling { enrollment, .. } = &self.mode {
            log::info!("Enrollment of {} abandoned", enrollment.name());
        }
        self.go_idle();
        self.sink.summary();
        log::info!("Recognition stopped");
    }

    /// Starts collecting samples for `name`.
    ///
    /// Opens the frame source if it is not already open. A recognizing
    /// session resumes once the enrollment ends.
    pub fn register(&mut self, name: &str) -> Result<(), OrchestratorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrchestratorError::EmptyName);
        }
        let resume_recognizing = match self.mode {
            Mode::Enrolling { .. } => return Err(OrchestratorError::Busy),
            Mode::Recognizing => true,
            Mode::Idle => {
                self.open_source()?;
                false
            }
        };

        log::info!(
            "Enrolling {name}: collecting {} samples",
            self.samples_per_enrollment
        );
        self.mode = Mode::Enrolling {
            enrollment: Enrollment::new(name, self.samples_per_enrollment, self.sample_interval),
            resume_recognizing,
        };
        Ok(())
    }

    /// Aborts an enrollment, discarding its samples. Returns `false` when
    /// nothing was being enrolled.
    pub fn cancel_enrollment(&mut self) -> bool {
        let Mode::Enrolling { enrollment, .. } = &self.mode else {
            return false;
        };
        log::info!(
            "Enrollment of {} cancelled after {} samples",
            enrollment.name(),
            enrollment.captured()
        );
        self.go_idle();
        true
    }

    /// Processes one frame according to the current state.
    pub fn tick(&mut self) -> TickOutcome {
        if matches!(self.mode, Mode::Idle) {
            return TickOutcome::Idle;
        }

        let outcome = match self.pull_frame() {
            Pulled::Exhausted => TickOutcome::NoFrame,
            Pulled::Failed => TickOutcome::FrameError,
            Pulled::Frame(frame) => match self.mode {
                Mode::Recognizing => self.recognize(frame),
                _ => self.collect_sample(&frame),
            },
        };

        let stats = self.stats();
        self.sink.stats(&stats);
        outcome
    }

    fn recognize(&mut self, mut frame: Frame) -> TickOutcome {
        let faces = self.locate(&frame);
        let mut annotations = Vec::with_capacity(faces.len());
        let mut recorded = Vec::new();

        for bounds in &faces {
            let outcome = match frame.crop(bounds) {
                Some(face) => MatchOutcome::evaluate(self.identities.predict(&face), &self.identities),
                None => MatchOutcome::Unknown { distance: None },
            };
            if let MatchOutcome::Match { name, .. } = &outcome {
                if self.commit(name) {
                    recorded.push(name.clone());
                }
            }
            annotations.push(FaceAnnotation {
                bounds: *bounds,
                outcome,
            });
        }
        self.total_detections += faces.len() as u64;

        for face in &annotations {
            let color = if face.outcome.is_match() {
                MATCH_COLOR
            } else {
                UNKNOWN_COLOR
            };
            frame.draw_rectangle(&face.bounds, color, BOX_THICKNESS);
        }
        self.sink.frame(&frame, &annotations);

        TickOutcome::Recognized {
            detections: faces.len(),
            recorded,
        }
    }

    /// Records attendance for `name` and greets them when it was committed.
    fn commit(&mut self, name: &str) -> bool {
        match self.ledger.record(name) {
            Ok(true) => {
                log::info!("Attendance recorded for {name}");
                self.notifier.notify(name);
                self.successful_recognitions += 1;
                true
            }
            Ok(false) => false,
            Err(e) => {
                log::error!("Attendance for {name} not recorded: {e}");
                false
            }
        }
    }

    fn collect_sample(&mut self, frame: &Frame) -> TickOutcome {
        let faces = self.locate(frame);
        let now = self.clock.now();
        let Mode::Enrolling { enrollment, .. } = &mut self.mode else {
            return TickOutcome::Idle;
        };

        match enrollment.offer(frame, &faces, now) {
            SampleDecision::Skipped { faces } => TickOutcome::SampleSkipped { faces },
            SampleDecision::TooSoon => TickOutcome::SampleDeferred,
            SampleDecision::Accepted { captured, target } => {
                self.sink.enrollment_progress(enrollment.name(), captured, target);
                if enrollment.is_complete() {
                    self.finish_enrollment()
                } else {
                    TickOutcome::SampleCaptured { captured, target }
                }
            }
        }
    }

    fn finish_enrollment(&mut self) -> TickOutcome {
        let Mode::Enrolling {
            enrollment,
            resume_recognizing,
        } = std::mem::replace(&mut self.mode, Mode::Idle)
        else {
            return TickOutcome::Idle;
        };
        // back to the pre-enrollment state; the source is still open here
        if resume_recognizing {
            self.mode = Mode::Recognizing;
        } else {
            self.source.release();
        }

        let (name, samples) = enrollment.into_parts();
        match self.identities.enroll(&name, &samples) {
            Ok(label) => {
                let persisted = match self.identities.persist(self.repository.as_ref()) {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("Enrolled {name} but the model was not saved: {e}");
                        false
                    }
                };
                TickOutcome::Enrolled {
                    name,
                    label,
                    persisted,
                }
            }
            Err(e) => {
                log::warn!("Enrollment of {name} failed: {e}");
                TickOutcome::EnrollmentFailed {
                    name,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn pull_frame(&mut self) -> Pulled {
        match self.source.next_frame() {
            Ok(Some(frame)) if !frame.is_empty() => Pulled::Frame(frame),
            Ok(Some(frame)) => {
                log::warn!("Frame {} is empty", frame.index());
                Pulled::Failed
            }
            Ok(None) => Pulled::Exhausted,
            Err(e) => {
                log::warn!("Frame capture failed: {e}");
                Pulled::Failed
            }
        }
    }

    fn locate(&mut self, frame: &Frame) -> Vec<BoundingBox> {
        self.locator.locate(frame).unwrap_or_else(|e| {
            log::warn!("Face location failed on frame {}: {e}", frame.index());
            Vec::new()
        })
    }

    fn open_source(&mut self) -> Result<(), OrchestratorError> {
        if let Err(e) = self.source.open() {
            self.source.release();
            log::warn!("Cannot open frame source: {e}");
            return Err(OrchestratorError::SourceUnavailable(e.to_string()));
        }
        Ok(())
    }

    fn go_idle(&mut self) {
        self.mode = Mode::Idle;
        self.source.release();
    }
}

impl Drop for RecognitionOrchestrator {
    fn drop(&mut self) {
        if !matches!(self.mode, Mode::Idle) {
            self.go_idle();
        }
    }
}
