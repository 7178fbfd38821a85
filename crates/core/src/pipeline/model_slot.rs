use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::recognition::domain::recognition_model::RecognitionModel;

/// Single-slot handoff of freshly trained models to the frame loop.
///
/// A retrain publishes a complete, immutable model; the frame loop takes it
/// at the next frame boundary. Publishing again before it was taken
/// replaces the pending model, so only the latest one is ever installed.
#[derive(Default)]
pub struct ModelSlot {
    pending: Mutex<Option<Arc<RecognitionModel>>>,
    published: AtomicU64,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, model: Arc<RecognitionModel>) {
        *self.pending.lock().unwrap() = Some(model);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes and returns the pending model, if any.
    pub fn take(&self) -> Option<Arc<RecognitionModel>> {
        self.pending.lock().unwrap().take()
    }

    /// Number of models published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::label_catalog::LabelCatalog;
    use crate::recognition::infrastructure::lbph_classifier::LbphClassifier;

    fn model(names: &[&str]) -> Arc<RecognitionModel> {
        Arc::new(RecognitionModel::new(
            Box::new(LbphClassifier::default()),
            LabelCatalog::from_names(names.iter().copied()),
        ))
    }

    #[test]
    fn test_empty_slot_yields_nothing() {
        let slot = ModelSlot::new();
        assert!(slot.take().is_none());
        assert_eq!(slot.published(), 0);
    }

    #[test]
    fn test_take_empties_slot() {
        let slot = ModelSlot::new();
        slot.publish(model(&["alice"]));
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_latest_publish_wins() {
        let slot = ModelSlot::new();
        slot.publish(model(&["alice"]));
        slot.publish(model(&["alice", "bob"]));
        assert_eq!(slot.take().unwrap().catalog().len(), 2);
        assert_eq!(slot.published(), 2);
    }

    #[test]
    fn test_publish_from_another_thread() {
        let slot = Arc::new(ModelSlot::new());
        let publisher = slot.clone();
        std::thread::spawn(move || publisher.publish(model(&["alice"])))
            .join()
            .unwrap();
        assert_eq!(slot.take().unwrap().catalog().name(0), Some("alice"));
    }
}
