use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;

use crate::recognition::domain::face_classifier::{FaceClassifier, Prediction};
use crate::recognition::domain::label_catalog::LabelCatalog;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model file not found: {0}")]
    MissingModel(PathBuf),
    #[error("label file not found: {0}")]
    MissingLabels(PathBuf),
    #[error("failed to read label file '{path}': {source}")]
    ReadLabels {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed label file '{path}': {source}")]
    ParseLabels {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to load model '{path}': {message}")]
    Classifier { path: PathBuf, message: String },
}

/// A trained classifier paired with the catalog it was trained against.
///
/// Immutable once built; retraining produces a new instance that replaces
/// this one wholesale.
pub struct RecognitionModel {
    classifier: Box<dyn FaceClassifier>,
    catalog: LabelCatalog,
}

impl RecognitionModel {
    pub fn new(classifier: Box<dyn FaceClassifier>, catalog: LabelCatalog) -> Self {
        Self {
            classifier,
            catalog,
        }
    }

    /// Loads both artifacts into `classifier`. Either one missing is fatal.
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        mut classifier: Box<dyn FaceClassifier>,
    ) -> Result<Self, ModelError> {
        if !model_path.exists() {
            return Err(ModelError::MissingModel(model_path.to_path_buf()));
        }
        if !labels_path.exists() {
            return Err(ModelError::MissingLabels(labels_path.to_path_buf()));
        }

        let json = fs::read_to_string(labels_path).map_err(|source| ModelError::ReadLabels {
            path: labels_path.to_path_buf(),
            source,
        })?;
        let catalog = LabelCatalog::from_json(&json).map_err(|source| ModelError::ParseLabels {
            path: labels_path.to_path_buf(),
            source,
        })?;

        classifier
            .read(model_path)
            .map_err(|e| ModelError::Classifier {
                path: model_path.to_path_buf(),
                message: e.to_string(),
            })?;

        log::info!(
            "Loaded recognition model with {} identities",
            catalog.len()
        );
        Ok(Self::new(classifier, catalog))
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn predict(&self, sample: &GrayImage) -> Result<Prediction, Box<dyn std::error::Error>> {
        self.classifier.predict(sample)
    }

    pub fn write_classifier(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.classifier.write(path)
    }
}
