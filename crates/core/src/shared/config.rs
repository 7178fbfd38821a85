use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::DEFAULT_SNAPSHOT_PADDING;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not find configuration file '{0}'")]
    NotFound(PathBuf),
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Values consumed by the recognition pipeline.
///
/// Field names are snake_case; the PascalCase keys of older
/// configuration files are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// ONNX face detection model. Resolved from the model cache when unset.
    #[serde(default, alias = "DetectorModel")]
    pub detector_model: Option<PathBuf>,
    #[serde(alias = "DataFolder")]
    pub data_folder: PathBuf,
    #[serde(alias = "ModelFile")]
    pub model_file: PathBuf,
    #[serde(alias = "LabelsFile")]
    pub labels_file: PathBuf,
    /// Maximum classifier distance accepted as a match (lower is stricter).
    #[serde(alias = "RecognitionThreshold")]
    pub recognition_threshold: f64,
    #[serde(alias = "MinFaceSize")]
    pub min_face_size: u32,
    #[serde(alias = "FrameSkip")]
    pub frame_skip: u64,
    #[serde(alias = "CameraSourceRaw", alias = "CameraSource")]
    pub camera_source: String,
    #[serde(alias = "AlertCooldownSeconds")]
    pub alert_cooldown_seconds: u64,
    #[serde(default = "default_snapshots_dir", alias = "SnapshotsDir")]
    pub snapshots_dir: PathBuf,
    #[serde(default = "default_snapshot_log", alias = "SnapshotLogFile")]
    pub snapshot_log_file: PathBuf,
    #[serde(default = "default_padding", alias = "SnapshotPadding")]
    pub snapshot_padding: f64,
    #[serde(default = "default_confidence", alias = "DetectionConfidence")]
    pub detection_confidence: f64,
    #[serde(default, alias = "FontFile")]
    pub font_file: Option<PathBuf>,
    #[serde(default, alias = "PreviewFile")]
    pub preview_file: Option<PathBuf>,
}

fn default_snapshots_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_snapshot_log() -> PathBuf {
    PathBuf::from("snapshots/log.csv")
}

fn default_padding() -> f64 {
    DEFAULT_SNAPSHOT_PADDING
}

fn default_confidence() -> f64 {
    0.5
}

impl AppConfig {
    /// Loads and validates a configuration file. Any failure is fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_skip == 0 {
            return Err(ConfigError::Invalid("frame_skip must be >= 1".into()));
        }
        if self.min_face_size == 0 {
            return Err(ConfigError::Invalid("min_face_size must be >= 1".into()));
        }
        if self.recognition_threshold.is_nan() || self.recognition_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "recognition_threshold must be positive, got {}",
                self.recognition_threshold
            )));
        }
        if self.snapshot_padding.is_nan() || self.snapshot_padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "snapshot_padding must be non-negative, got {}",
                self.snapshot_padding
            )));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "detection_confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            )));
        }
        if self.camera_source.trim().is_empty() {
            return Err(ConfigError::Invalid("camera_source must not be empty".into()));
        }
        Ok(())
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_seconds)
    }
}
