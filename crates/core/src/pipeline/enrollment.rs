use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// What happened to a frame offered to an enrollment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleDecision {
    Accepted { captured: usize, target: usize },
    /// The frame did not contain exactly one usable face.
    Skipped { faces: usize },
    /// A face was found but the previous sample is too recent.
    TooSoon,
}

/// Sample collection for one person being enrolled.
///
/// Only frames with exactly one face count, and accepted samples are at
/// least `interval` apart. There is no cap on attempts.
#[derive(Debug)]
pub struct Enrollment {
    name: String,
    target: usize,
    interval: TimeDelta,
    samples: Vec<Frame>,
    last_accepted: Option<DateTime<Local>>,
}

impl Enrollment {
    pub fn new(name: impl Into<String>, target: usize, interval: Duration) -> Self {
        Self {
            name: name.into(),
            target: target.max(1),
            interval: TimeDelta::from_std(interval).unwrap_or(TimeDelta::zero()),
            samples: Vec::new(),
            last_accepted: None,
        }
    }

    pub fn offer(&mut self, frame: &Frame, faces: &[BoundingBox], now: DateTime<Local>) -> SampleDecision {
        let [face] = faces else {
            return SampleDecision::Skipped { faces: faces.len() };
        };
        if let Some(last) = self.last_accepted {
            if now.signed_duration_since(last) < self.interval {
                return SampleDecision::TooSoon;
            }
        }
        let Some(sample) = frame.crop(face) else {
            return SampleDecision::Skipped { faces: 1 };
        };

        self.samples.push(sample);
        self.last_accepted = Some(now);
        SampleDecision::Accepted {
            captured: self.samples.len(),
            target: self.target,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn captured(&self) -> usize {
        self.samples.len()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn into_parts(self) -> (String, Vec<Frame>) {
        (self.name, self.samples)
    }
}
