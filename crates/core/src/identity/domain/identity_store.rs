use std::collections::BTreeMap;

use thiserror::Error;

use crate::detection::domain::classifier::{Classifier, Label, Prediction};
use crate::identity::domain::model_repository::{Identity, ModelArtifact, ModelRepository};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("display name must not be empty")]
    EmptyName,
    #[error("training failed for {name}: {reason}")]
    TrainingFailed { name: String, reason: String },
    #[error("failed to persist model: {0}")]
    Persist(String),
    #[error("no labels left to allocate")]
    LabelsExhausted,
}

/// Result of [`IdentityStore::load`]. Loading never fails hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { identities: usize },
    NotFound,
}

/// Label → display name table plus the classifier trained on those labels.
///
/// Labels are handed out in increasing order and never reused for the
/// lifetime of the store, even when training for a label fails. Enrolling
/// an existing display name again allocates a fresh label. `Label::MAX` is
/// never handed out.
pub struct IdentityStore {
    classifier: Box<dyn Classifier>,
    names: BTreeMap<Label, String>,
    next_label: Label,
}

impl IdentityStore {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            names: BTreeMap::new(),
            next_label: 0,
        }
    }

    /// Allocates the next label for `name` and trains the classifier on
    /// `samples` under it.
    ///
    /// The name is trimmed; an empty result is rejected before any state
    /// changes, as is running out of labels.
    pub fn enroll(&mut self, name: &str, samples: &[Frame]) -> Result<Label, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }

        let label = self.next_label;
        self.next_label = label.checked_add(1).ok_or(IdentityError::LabelsExhausted)?;

        self.classifier
            .train(label, samples)
            .map_err(|e| IdentityError::TrainingFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        self.names.insert(label, name.to_string());
        log::info!("Enrolled {name} as label {label} from {} samples", samples.len());
        Ok(label)
    }

    pub fn resolve(&self, label: Label) -> Option<&str> {
        self.names.get(&label).map(String::as_str)
    }

    pub fn predict(&self, face: &Frame) -> Prediction {
        self.classifier.predict(face)
    }

    /// Enrolled identities in label order.
    pub fn identities(&self) -> Vec<Identity> {
        self.names
            .iter()
            .map(|(&label, name)| Identity {
                label,
                display_name: name.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn persist(&self, repository: &dyn ModelRepository) -> Result<(), IdentityError> {
        let classifier_state = self
            .classifier
            .export_state()
            .map_err(|e| IdentityError::Persist(e.to_string()))?;
        let artifact = ModelArtifact {
            next_label: self.next_label,
            identities: self.identities(),
            classifier_state,
        };
        repository
            .save(&artifact)
            .map_err(|e| IdentityError::Persist(e.to_string()))
    }

    /// Replaces the store's contents with the saved artifact.
    ///
    /// A missing or unreadable artifact leaves the store empty and reports
    /// `NotFound`. So does one holding `Label::MAX`.
    pub fn load(&mut self, repository: &dyn ModelRepository) -> LoadOutcome {
        self.clear();
        let artifact = match repository.load() {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return LoadOutcome::NotFound,
            Err(e) => {
                log::warn!("Model artifact unreadable, starting empty: {e}");
                return LoadOutcome::NotFound;
            }
        };

        if let Err(e) = self.classifier.import_state(&artifact.classifier_state) {
            log::warn!("Classifier state unreadable, starting empty: {e}");
            self.clear();
            return LoadOutcome::NotFound;
        }

        let next_label = match artifact.identities.iter().map(|i| i.label).max() {
            Some(max) => match max.checked_add(1) {
                Some(after_max) => artifact.next_label.max(after_max),
                None => {
                    log::warn!("Model artifact uses label {max}, starting empty");
                    self.clear();
                    return LoadOutcome::NotFound;
                }
            },
            None => artifact.next_label,
        };
        self.names = artifact
            .identities
            .into_iter()
            .map(|i| (i.label, i.display_name))
            .collect();
        self.next_label = next_label;

        LoadOutcome::Loaded {
            identities: self.names.len(),
        }
    }

    fn clear(&mut self) {
        self.classifier.reset();
        self.names.clear();
        self.next_label = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    /// Remembers trained labels; predicts the most recently trained one.
    #[derive(Default)]
    struct StubClassifier {
        labels: Vec<Label>,
        fail_training: bool,
    }

    impl Classifier for StubClassifier {
        fn train(
            &mut self,
            label: Label,
            samples: &[Frame],
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_training || samples.is_empty() {
                return Err("training rejected".into());
            }
            self.labels.push(label);
            Ok(())
        }

        fn predict(&self, _face: &Frame) -> Prediction {
            match self.labels.last() {
                Some(&label) => Prediction::Candidate {
                    label,
                    distance: 10.0,
                },
                None => Prediction::NoMatch,
            }
        }

        fn export_state(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
            Ok(serde_json::to_vec(&self.labels)?)
        }

        fn import_state(&mut self, state: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
            self.labels = serde_json::from_slice(state)?;
            Ok(())
        }

        fn reset(&mut self) {
            self.labels.clear();
        }
    }

    #[derive(Default, Clone)]
    struct MemoryRepository {
        artifact: Arc<Mutex<Option<ModelArtifact>>>,
        fail: bool,
    }

    impl ModelRepository for MemoryRepository {
        fn load(&self) -> Result<Option<ModelArtifact>, Box<dyn std::error::Error>> {
            if self.fail {
                return Err("disk on fire".into());
            }
            Ok(self.artifact.lock().unwrap().clone())
        }

        fn save(&self, artifact: &ModelArtifact) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("disk on fire".into());
            }
            *self.artifact.lock().unwrap() = Some(artifact.clone());
            Ok(())
        }
    }

    // --- Helpers ---

    fn samples(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, i))
            .collect()
    }

    fn store() -> IdentityStore {
        IdentityStore::new(Box::new(StubClassifier::default()))
    }

    // --- Tests ---

    #[test]
    fn test_enroll_two_people_gets_distinct_labels() {
        let mut store = store();
        let alice = store.enroll("Alice", &samples(5)).unwrap();
        let bob = store.enroll("Bob", &samples(5)).unwrap();

        assert_ne!(alice, bob);
        assert_eq!(store.resolve(alice), Some("Alice"));
        assert_eq!(store.resolve(bob), Some("Bob"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_enroll_empty_name_rejected_without_state_change() {
        let mut store = store();
        assert!(matches!(
            store.enroll("   ", &samples(5)),
            Err(IdentityError::EmptyName)
        ));
        assert!(store.is_empty());
        // the first real enrollment still gets label 0
        assert_eq!(store.enroll("Alice", &samples(5)).unwrap(), 0);
    }

    #[test]
    fn test_enroll_trims_name() {
        let mut store = store();
        let label = store.enroll("  Alice ", &samples(5)).unwrap();
        assert_eq!(store.resolve(label), Some("Alice"));
    }

    #[test]
    fn test_reenrolling_same_name_allocates_new_label() {
        let mut store = store();
        let first = store.enroll("Alice", &samples(5)).unwrap();
        let second = store.enroll("Alice", &samples(5)).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.resolve(first), Some("Alice"));
        assert_eq!(store.resolve(second), Some("Alice"));
    }

    #[test]
    fn test_failed_training_burns_label() {
        let mut store = store();
        assert!(matches!(
            store.enroll("Alice", &[]),
            Err(IdentityError::TrainingFailed { .. })
        ));
        assert_eq!(store.resolve(0), None);
        assert_eq!(store.enroll("Bob", &samples(5)).unwrap(), 1);
    }

    #[test]
    fn test_resolve_unknown_label() {
        assert_eq!(store().resolve(42), None);
    }

    #[test]
    fn test_persist_then_load_restores_store() {
        let repo = MemoryRepository::default();
        let mut original = store();
        original.enroll("Alice", &samples(5)).unwrap();
        original.enroll("Bob", &samples(5)).unwrap();
        original.persist(&repo).unwrap();

        let mut restored = store();
        let outcome = restored.load(&repo);

        assert_eq!(outcome, LoadOutcome::Loaded { identities: 2 });
        assert_eq!(restored.identities(), original.identities());
        assert_eq!(
            restored.predict(&samples(1)[0]),
            original.predict(&samples(1)[0])
        );
        // the counter survives the reload
        assert_eq!(restored.enroll("Carol", &samples(5)).unwrap(), 2);
    }

    #[test]
    fn test_load_missing_artifact_is_not_found() {
        let mut store = store();
        assert_eq!(
            store.load(&MemoryRepository::default()),
            LoadOutcome::NotFound
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_unreadable_artifact_leaves_store_empty() {
        let mut store = store();
        store.enroll("Alice", &samples(5)).unwrap();
        let repo = MemoryRepository {
            fail: true,
            ..Default::default()
        };

        assert_eq!(store.load(&repo), LoadOutcome::NotFound);
        assert!(store.is_empty());
        assert_eq!(store.predict(&samples(1)[0]), Prediction::NoMatch);
    }

    #[test]
    fn test_load_corrupt_classifier_state_is_not_found() {
        let repo = MemoryRepository::default();
        *repo.artifact.lock().unwrap() = Some(ModelArtifact {
            next_label: 1,
            identities: vec![Identity {
                label: 0,
                display_name: "Alice".into(),
            }],
            classifier_state: b"garbage".to_vec(),
        });

        let mut store = store();
        assert_eq!(store.load(&repo), LoadOutcome::NotFound);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_repairs_stale_counter() {
        let repo = MemoryRepository::default();
        *repo.artifact.lock().unwrap() = Some(ModelArtifact {
            next_label: 0,
            identities: vec![Identity {
                label: 4,
                display_name: "Alice".into(),
            }],
            classifier_state: b"[4]".to_vec(),
        });

        let mut store = store();
        store.load(&repo);
        assert_eq!(store.enroll("Bob", &samples(5)).unwrap(), 5);
    }

    #[test]
    fn test_load_rejects_artifact_at_label_ceiling() {
        let repo = MemoryRepository::default();
        *repo.artifact.lock().unwrap() = Some(ModelArtifact {
            next_label: 0,
            identities: vec![Identity {
                label: Label::MAX,
                display_name: "Alice".into(),
            }],
            classifier_state: b"[]".to_vec(),
        });

        let mut store = store();
        assert_eq!(store.load(&repo), LoadOutcome::NotFound);
        assert!(store.is_empty());
        assert_eq!(store.enroll("Bob", &samples(5)).unwrap(), 0);
    }

    #[test]
    fn test_enroll_when_labels_run_out() {
        let repo = MemoryRepository::default();
        *repo.artifact.lock().unwrap() = Some(ModelArtifact {
            next_label: Label::MAX,
            identities: vec![Identity {
                label: 0,
                display_name: "Alice".into(),
            }],
            classifier_state: b"[0]".to_vec(),
        });
        let mut store = store();
        assert_eq!(store.load(&repo), LoadOutcome::Loaded { identities: 1 });

        assert!(matches!(
            store.enroll("Bob", &samples(5)),
            Err(IdentityError::LabelsExhausted)
        ));
        assert_eq!(store.identities().len(), 1);
        assert_eq!(store.predict(&samples(1)[0]), Prediction::Candidate { label: 0, distance: 10.0 });
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let mut store = store();
        store.enroll("Alice", &samples(5)).unwrap();
        let repo = MemoryRepository {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            store.persist(&repo),
            Err(IdentityError::Persist(_))
        ));
    }
}
