use std::path::Path;

use image::GrayImage;

/// Nearest-match outcome of a classifier query.
///
/// `distance` follows distance semantics: lower is a better match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub label: u32,
    pub distance: f64,
}

/// Trainable face classifier operating on canonical face samples.
///
/// Samples are single-channel images already brought to the canonical size
/// and equalized (see [`crate::recognition::domain::face_sample`]).
pub trait FaceClassifier: Send + Sync {
    /// Replaces any previous state with a model fitted to `samples`.
    /// `labels[i]` is the identity label of `samples[i]`.
    fn train(
        &mut self,
        samples: &[GrayImage],
        labels: &[u32],
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>>;

    fn read(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>>;

    fn predict(&self, sample: &GrayImage) -> Result<Prediction, Box<dyn std::error::Error>>;
}
