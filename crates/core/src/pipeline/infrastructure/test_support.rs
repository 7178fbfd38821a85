//! Fakes shared by the executor tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::correlation_tracker::CorrelationTrackerFactory;
use crate::pipeline::frame_orchestrator::{FrameOrchestrator, OrchestratorSettings};
use crate::recognition::domain::label_catalog::LabelCatalog;
use crate::recognition::domain::recognition_model::RecognitionModel;
use crate::recognition::infrastructure::lbph_classifier::LbphClassifier;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::video::domain::frame_source::{FrameGrab, FrameSource};

pub enum FrameGrabStep {
    Frame,
    Empty,
    Fail,
}

/// Plays back a fixed script of grabs, then reports the end of stream.
pub struct ScriptedSource {
    script: VecDeque<FrameGrabStep>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedSource {
    pub fn with_script(script: Vec<FrameGrabStep>) -> (Self, Arc<Mutex<bool>>) {
        let closed = Arc::new(Mutex::new(false));
        let source = Self {
            script: script.into(),
            closed: closed.clone(),
        };
        (source, closed)
    }

    pub fn frames(count: usize) -> (Self, Arc<Mutex<bool>>) {
        Self::with_script((0..count).map(|_| FrameGrabStep::Frame).collect())
    }
}

impl FrameSource for ScriptedSource {
    fn grab_frame(&mut self) -> Result<FrameGrab, Box<dyn std::error::Error>> {
        match self.script.pop_front() {
            Some(FrameGrabStep::Frame) => Ok(FrameGrab::Frame(Frame::new(
                vec![90u8; 64 * 48 * 3],
                64,
                48,
                3,
            ))),
            Some(FrameGrabStep::Empty) => Ok(FrameGrab::Empty),
            Some(FrameGrabStep::Fail) => Err("device hiccup".into()),
            None => Ok(FrameGrab::Ended),
        }
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

struct NoFaces;

impl FaceDetector for NoFaces {
    fn detect(
        &mut self,
        _frame: &Frame,
        _min_size: u32,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        Ok(Vec::new())
    }
}

/// Orchestrator over an empty scene.
pub fn orchestrator(frame_skip: u64) -> FrameOrchestrator {
    FrameOrchestrator::new(
        Box::new(NoFaces),
        Box::new(CorrelationTrackerFactory::default()),
        Arc::new(RecognitionModel::new(
            Box::new(LbphClassifier::default()),
            LabelCatalog::from_names(["alice"]),
        )),
        OrchestratorSettings {
            frame_skip,
            min_face_size: 20,
            recognition_threshold: 80.0,
            alert_cooldown: Duration::from_secs(60),
        },
    )
}
