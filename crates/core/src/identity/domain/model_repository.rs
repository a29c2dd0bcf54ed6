use serde::{Deserialize, Serialize};

use crate::detection::domain::classifier::Label;

/// An enrolled person.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub label: Label,
    pub display_name: String,
}

/// Everything needed to rebuild an identity store: the label table, the
/// label counter and the classifier's opaque state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub next_label: Label,
    pub identities: Vec<Identity>,
    pub classifier_state: Vec<u8>,
}

/// Durable home of the model artifact.
pub trait ModelRepository: Send {
    /// Returns `Ok(None)` when no artifact has been saved yet.
    fn load(&self) -> Result<Option<ModelArtifact>, Box<dyn std::error::Error>>;

    fn save(&self, artifact: &ModelArtifact) -> Result<(), Box<dyn std::error::Error>>;
}
