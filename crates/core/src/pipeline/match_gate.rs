use crate::detection::domain::classifier::{Label, Prediction};
use crate::identity::domain::identity_store::IdentityStore;
use crate::shared::constants::{MATCH_DISTANCE_LIMIT, UNKNOWN_NAME};

/// What one classified face amounts to after the confidence gate.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome {
    Match {
        label: Label,
        name: String,
        distance: f64,
    },
    /// No candidate, a label nobody owns, or a distance at or above the
    /// limit. `distance` is kept for display when there was a candidate.
    Unknown { distance: Option<f64> },
}

impl MatchOutcome {
    /// A prediction matches only when its label resolves and its distance
    /// is strictly below the limit.
    pub fn evaluate(prediction: Prediction, identities: &IdentityStore) -> Self {
        match prediction {
            Prediction::NoMatch => MatchOutcome::Unknown { distance: None },
            Prediction::Candidate { label, distance } => {
                match identities.resolve(label) {
                    Some(name) if distance < MATCH_DISTANCE_LIMIT => MatchOutcome::Match {
                        label,
                        name: name.to_string(),
                        distance,
                    },
                    _ => MatchOutcome::Unknown {
                        distance: Some(distance),
                    },
                }
            }
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Match { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            MatchOutcome::Match { name, .. } => name,
            MatchOutcome::Unknown { .. } => UNKNOWN_NAME,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            MatchOutcome::Match { distance, .. } => Some(confidence(*distance)),
            MatchOutcome::Unknown { distance } => distance.map(confidence),
        }
    }
}

/// `100 - distance`, clamped to `0..=100`.
pub fn confidence(distance: f64) -> f64 {
    (MATCH_DISTANCE_LIMIT - distance).clamp(0.0, 100.0)
}
