use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::identity::domain::model_repository::{ModelArtifact, ModelRepository};

/// Stores the model artifact as one JSON file.
///
/// Writes go to a `.part` file first and are renamed into place, so a
/// crash mid-write never leaves a truncated artifact behind.
pub struct JsonModelFile {
    path: PathBuf,
}

impl JsonModelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelRepository for JsonModelFile {
    fn load(&self) -> Result<Option<ModelArtifact>, Box<dyn std::error::Error>> {
        let json = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("cannot read {}: {e}", self.path.display()).into()),
        };
        let artifact = serde_json::from_slice(&json)
            .map_err(|e| format!("invalid model artifact {}: {e}", self.path.display()))?;
        Ok(Some(artifact))
    }

    fn save(&self, artifact: &ModelArtifact) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec(artifact)?;

        let temp_path = self.path.with_extension("part");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        log::debug!("Model saved to {}", self.path.display());
        Ok(())
    }
}
