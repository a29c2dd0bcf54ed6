use crate::shared::frame::Frame;

/// Integer identifier the identity store assigns to an enrolled person.
pub type Label = u32;

/// What a classifier made of one face crop.
///
/// Lower distance means a closer match. `NoMatch` covers everything the
/// classifier could not score: an untrained model, an unusable crop, or an
/// internal failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Prediction {
    Candidate { label: Label, distance: f64 },
    NoMatch,
}

/// Statistical face model trained per label.
///
/// State is exchanged as opaque bytes so the identity store can persist it
/// alongside the label table in one artifact.
pub trait Classifier: Send {
    /// Adds `samples` as examples of `label`. Existing labels are kept.
    fn train(&mut self, label: Label, samples: &[Frame]) -> Result<(), Box<dyn std::error::Error>>;

    fn predict(&self, face: &Frame) -> Prediction;

    fn export_state(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    fn import_state(&mut self, state: &[u8]) -> Result<(), Box<dyn std::error::Error>>;

    /// Forgets everything learned.
    fn reset(&mut self);
}
