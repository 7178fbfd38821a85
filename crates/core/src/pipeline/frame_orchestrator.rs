use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::alerting::alert_cooldown::AlertCooldown;
use crate::alerting::snapshot_recorder::SnapshotRecorder;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_tracker::TrackerFactory;
use crate::pipeline::frame_annotator::FrameAnnotator;
use crate::pipeline::model_slot::ModelSlot;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::tracking_ledger::TrackingLedger;
use crate::recognition::domain::recognition_gate::RecognitionGate;
use crate::recognition::domain::recognition_model::RecognitionModel;
use crate::shared::config::AppConfig;
use crate::shared::frame::Frame;
use crate::shared::imaging::normalize;
use crate::shared::region::Region;

/// Knobs of the per-frame loop.
#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Detection runs on frames whose 1-based index is a multiple of this.
    pub frame_skip: u64,
    pub min_face_size: u32,
    pub recognition_threshold: f64,
    pub alert_cooldown: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            frame_skip: config.frame_skip,
            min_face_size: config.min_face_size,
            recognition_threshold: config.recognition_threshold,
            alert_cooldown: config.alert_cooldown(),
        }
    }
}

/// Side effect produced while processing a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    /// A newly tracked identity passed its alert cooldown.
    Alert {
        label: u32,
        name: String,
        at: DateTime<Local>,
    },
    /// An evidence image was saved for a newly tracked identity.
    Snapshot { name: String, path: PathBuf },
    /// A retrained model was installed before this frame.
    ModelSwapped { identities: usize },
}

/// Result of one orchestration step.
pub struct FrameReport {
    /// 1-based index of the processed frame.
    pub index: u64,
    /// Color copy of the input with boxes and names drawn on it.
    pub annotated: Frame,
    pub events: Vec<FrameEvent>,
    /// Faces under tracking after this frame.
    pub tracked: usize,
    /// Raw detector output count; 0 on frames without detection.
    pub detections: usize,
}

/// Drives detection, tracking and recognition for a live stream.
///
/// Every frame advances the existing tracks and re-labels them for display.
/// Every `frame_skip`-th frame additionally runs the detector; detections
/// that overlap a track are dropped, the rest go through the recognition
/// gate. Known faces become new tracks and trigger alert and snapshot;
/// unknown faces are only annotated and are re-evaluated next cycle.
pub struct FrameOrchestrator {
    detector: Box<dyn FaceDetector>,
    trackers: Box<dyn TrackerFactory>,
    model: Arc<RecognitionModel>,
    gate: RecognitionGate,
    ledger: TrackingLedger,
    cooldown: AlertCooldown,
    snapshots: Option<SnapshotRecorder>,
    annotator: FrameAnnotator,
    model_slot: Option<Arc<ModelSlot>>,
    frame_skip: u64,
    min_face_size: u32,
    frame_index: u64,
}

impl FrameOrchestrator {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        trackers: Box<dyn TrackerFactory>,
        model: Arc<RecognitionModel>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            detector,
            trackers,
            model,
            gate: RecognitionGate::new(settings.recognition_threshold),
            ledger: TrackingLedger::new(),
            cooldown: AlertCooldown::new(settings.alert_cooldown),
            snapshots: None,
            annotator: FrameAnnotator::default(),
            model_slot: None,
            frame_skip: settings.frame_skip.max(1),
            min_face_size: settings.min_face_size,
            frame_index: 0,
        }
    }

    pub fn with_snapshots(mut self, recorder: SnapshotRecorder) -> Self {
        self.snapshots = Some(recorder);
        self
    }

    pub fn with_annotator(mut self, annotator: FrameAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    /// Installs models published to `slot` at frame boundaries.
    pub fn with_model_slot(mut self, slot: Arc<ModelSlot>) -> Self {
        self.model_slot = Some(slot);
        self
    }

    pub fn ledger(&self) -> &TrackingLedger {
        &self.ledger
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn model(&self) -> &Arc<RecognitionModel> {
        &self.model
    }

    /// Processes one camera frame. Returns `None` for an empty frame, which
    /// leaves the frame counter and the tracks untouched.
    pub fn process(&mut self, frame: &Frame, logger: &mut dyn PipelineLogger) -> Option<FrameReport> {
        if frame.is_empty() {
            log::debug!("Skipping empty frame");
            return None;
        }

        let mut events = Vec::new();
        if let Some(model) = self.model_slot.as_ref().and_then(|slot| slot.take()) {
            let identities = model.catalog().len();
            self.model = model;
            logger.info(&format!("Installed retrained model ({identities} identities)"));
            events.push(FrameEvent::ModelSwapped { identities });
        }

        self.frame_index += 1;
        let index = self.frame_index;

        let t0 = Instant::now();
        let gray = normalize(frame);
        logger.timing("normalize", elapsed_ms(t0));

        let mut canvas = frame.to_rgb_image();

        let t0 = Instant::now();
        let lost = self.ledger.advance(&gray);
        if lost > 0 {
            log::debug!("Frame {index}: {lost} track(s) lost");
        }
        logger.timing("track", elapsed_ms(t0));

        let t0 = Instant::now();
        for face in self.ledger.faces_mut() {
            let result = self.gate.classify(&self.model, &gray, face.region());
            face.set_last_name(result.name);
            self.annotator
                .draw_tracked(&mut canvas, face.region(), face.last_name());
        }
        logger.timing("recognize", elapsed_ms(t0));

        let mut detections = 0;
        if index % self.frame_skip == 0 {
            let t0 = Instant::now();
            let found = match self.detector.detect(&gray, self.min_face_size) {
                Ok(regions) => regions,
                Err(e) => {
                    log::warn!("Face detection failed on frame {index}: {e}");
                    Vec::new()
                }
            };
            logger.timing("detect", elapsed_ms(t0));
            detections = found.len();

            for region in found {
                self.consider_detection(frame, &gray, region, &mut canvas, &mut events);
            }
        }

        logger.metric("tracked_faces", self.ledger.len() as f64);
        logger.metric("detections", detections as f64);
        logger.frame_done(index);

        Some(FrameReport {
            index,
            annotated: Frame::from_rgb(canvas),
            events,
            tracked: self.ledger.len(),
            detections,
        })
    }

    fn consider_detection(
        &mut self,
        frame: &Frame,
        gray: &Frame,
        region: Region,
        canvas: &mut image::RgbImage,
        events: &mut Vec<FrameEvent>,
    ) {
        if self.ledger.overlaps_any(&region) {
            return;
        }

        let result = self.gate.classify(&self.model, gray, &region);
        let Some(label) = result.label else {
            self.annotator.draw_unknown(canvas, &region, &result.name);
            return;
        };

        let mut tracker = self.trackers.create();
        if let Err(e) = tracker.init(gray, region) {
            log::warn!("Could not start tracking {} at {region:?}: {e}", result.name);
            return;
        }
        self.ledger.admit(tracker, region, label, &result.name);
        self.annotator.draw_admitted(canvas, &region, &result.name);

        if self.cooldown.should_alert(label) {
            let at = Local::now();
            log::info!("Alert: {} detected at {}", result.name, at.format("%H:%M:%S"));
            events.push(FrameEvent::Alert {
                label,
                name: result.name.clone(),
                at,
            });
        }

        if let Some(recorder) = &self.snapshots {
            if let Some(path) = recorder.record(frame, &region, &result.name) {
                events.push(FrameEvent::Snapshot {
                    name: result.name,
                    path,
                });
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
