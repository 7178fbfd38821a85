use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::model_slot::ModelSlot;
use crate::recognition::domain::face_classifier::FaceClassifier;
use crate::recognition::model_trainer::{save_model, ModelTrainer};

pub enum RetrainMessage {
    Started,
    /// The new model is saved and published to the slot.
    Complete { identities: usize },
    Error(String),
}

/// Builds the trainer on the retrain thread. Opening the detector can be
/// slow (model download, inference session setup).
pub type TrainerFactory =
    Box<dyn FnOnce() -> Result<ModelTrainer, Box<dyn std::error::Error>> + Send>;

pub struct RetrainParams {
    pub trainer: TrainerFactory,
    pub classifier: Box<dyn FaceClassifier>,
    pub data_folder: PathBuf,
    pub model_file: PathBuf,
    pub labels_file: PathBuf,
    pub slot: Arc<ModelSlot>,
}

/// Retrains on a background thread while the frame loop keeps running on
/// the previous model. On success the artifacts are replaced on disk and
/// the model is published to `slot`; the frame loop installs it at its
/// next frame. On failure nothing is published.
pub fn spawn(params: RetrainParams) -> Receiver<RetrainMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<RetrainMessage>();

    thread::spawn(move || {
        let _ = tx.send(RetrainMessage::Started);
        if let Err(e) = run_retrain(&tx, params) {
            log::error!("Retraining failed: {e}");
            let _ = tx.send(RetrainMessage::Error(e.to_string()));
        }
    });

    rx
}

fn run_retrain(
    tx: &Sender<RetrainMessage>,
    params: RetrainParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let RetrainParams {
        trainer,
        classifier,
        data_folder,
        model_file,
        labels_file,
        slot,
    } = params;

    let mut trainer = trainer()?;
    log::info!("Retraining from {}", data_folder.display());
    let model = trainer.train(&data_folder, classifier)?;
    save_model(&model, &model_file, &labels_file)?;

    let identities = model.catalog().len();
    slot.publish(Arc::new(model));
    let _ = tx.send(RetrainMessage::Complete { identities });
    Ok(())
}
