use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_LEDGER_FILE, DEFAULT_MODEL_FILE, SAMPLES_PER_ENROLLMENT,
    SAMPLE_INTERVAL_MS, TICK_INTERVAL_MS,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Greeting delivery settings. `speed` and `pitch` are passed straight to
/// the speech command (`espeak -s <speed> -p <pitch>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub command: String,
    pub speed: u32,
    pub pitch: u32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak".to_string(),
            speed: 150,
            pitch: 50,
        }
    }
}

/// Application configuration, stored as JSON.
///
/// Missing fields fall back to their defaults, so a config file only needs
/// to mention what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub model_file: String,
    pub tick_interval_ms: u64,
    pub samples_per_enrollment: usize,
    pub sample_interval_ms: u64,
    pub voice: VoiceSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: DEFAULT_LEDGER_FILE.to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            tick_interval_ms: TICK_INTERVAL_MS,
            samples_per_enrollment: SAMPLES_PER_ENROLLMENT,
            sample_interval_ms: SAMPLE_INTERVAL_MS,
            voice: VoiceSettings::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl AppConfig {
    /// `<config dir>/FaceSecure/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist and parse. Without one, the default
    /// location is tried and any problem there yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path).unwrap_or_else(|e| {
                    log::warn!("Ignoring config: {e}");
                    Self::default()
                }),
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples_per_enrollment == 0 {
            return Err(ConfigError::Invalid(
                "samples_per_enrollment must be at least 1".into(),
            ));
        }
        if self.ledger_file.trim().is_empty() || self.model_file.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ledger_file and model_file must be set".into(),
            ));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
