use crate::recognition::domain::face_sample::canonical_sample;
use crate::recognition::domain::recognition_model::RecognitionModel;
use crate::shared::constants::UNKNOWN_NAME;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Outcome of classifying one face region.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognitionResult {
    pub name: String,
    /// Raw classifier distance; `f64::MAX` when no classification was possible.
    pub distance: f64,
    /// `Some` only for accepted identities.
    pub label: Option<u32>,
}

impl RecognitionResult {
    pub fn unknown(distance: f64) -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            distance,
            label: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.label.is_some()
    }
}

/// Turns a classifier distance into an accept/reject decision.
///
/// A prediction is accepted iff its distance is strictly below the
/// threshold and its label exists in the model's catalog.
#[derive(Clone, Copy, Debug)]
pub struct RecognitionGate {
    threshold: f64,
}

impl RecognitionGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Classifies `region` of a normalized frame. Never fails: regions
    /// outside the frame and classifier errors map to an unknown result
    /// with distance `f64::MAX`.
    pub fn classify(
        &self,
        model: &RecognitionModel,
        frame: &Frame,
        region: &Region,
    ) -> RecognitionResult {
        let Some(sample) = canonical_sample(frame, region) else {
            return RecognitionResult::unknown(f64::MAX);
        };

        let prediction = match model.predict(&sample) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Classifier failed on region {region:?}: {e}");
                return RecognitionResult::unknown(f64::MAX);
            }
        };

        match model.catalog().name(prediction.label) {
            Some(name) if prediction.distance < self.threshold => RecognitionResult {
                name: name.to_string(),
                distance: prediction.distance,
                label: Some(prediction.label),
            },
            _ => RecognitionResult::unknown(prediction.distance),
        }
    }
}
