use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use recognizer_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use recognizer_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_MATCH_THRESHOLD, DEFAULT_STALENESS, DETECTOR_MODEL_URL,
};
use recognizer_core::shared::model_resolver::ModelSource;

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
    #[error("no identity source configured (use --database or set \"source\" in the config file)")]
    MissingSource,
    #[error("{0}")]
    Invalid(String),
}

/// Where the active identities are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum SourceConfig {
    Sqlite(PathBuf),
    Json(PathBuf),
}

impl SourceConfig {
    /// `.json` files are read as identity lists; anything else as SQLite.
    pub fn from_path(path: PathBuf) -> Self {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            SourceConfig::Json(path)
        } else {
            SourceConfig::Sqlite(path)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

impl ModelConfig {
    pub fn to_source(&self) -> ModelSource {
        ModelSource {
            path: self.path.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub source: Option<SourceConfig>,
    /// Base for relative reference-photo paths.
    pub image_base: PathBuf,
    pub staleness_secs: u64,
    pub match_threshold: f64,
    pub detector_confidence: f64,
    pub detector_model: ModelConfig,
    pub embedder_model: ModelConfig,
    /// Pre-packaged models, consulted after the user cache.
    pub bundled_models_dir: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            source: None,
            image_base: PathBuf::from("."),
            staleness_secs: DEFAULT_STALENESS.as_secs(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            detector_confidence: DEFAULT_CONFIDENCE,
            detector_model: ModelConfig {
                path: None,
                url: Some(DETECTOR_MODEL_URL.to_string()),
            },
            embedder_model: ModelConfig::default(),
            bundled_models_dir: None,
        }
    }
}

impl RecognizerConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    /// Reads an explicit config file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
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

    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.is_none() {
            return Err(ConfigError::MissingSource);
        }
        if !(self.match_threshold.is_finite() && self.match_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Match threshold must be positive, got {}",
                self.match_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.detector_confidence) {
            return Err(ConfigError::Invalid(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.detector_confidence
            )));
        }
        Ok(())
    }
}
