use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::pipeline::frame_orchestrator::{FrameOrchestrator, FrameReport};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::frame_source::FrameSource;

/// Called with every processed frame. Returning `false` stops the run.
pub type FrameCallback = Box<dyn FnMut(FrameReport) -> bool + Send>;

/// Configuration for a pipeline execution run.
pub struct PipelineConfig {
    pub on_frame: Option<FrameCallback>,
    pub cancelled: Arc<AtomicBool>,
}

impl PipelineConfig {
    pub fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            on_frame: None,
            cancelled,
        }
    }

    pub fn with_on_frame(mut self, on_frame: FrameCallback) -> Self {
        self.on_frame = Some(on_frame);
        self
    }
}

/// Abstracts how the grab → orchestrate → report loop is executed.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations (single-threaded, threaded capture).
///
/// Runs until the source ends, the callback returns `false`, or
/// `cancelled` is set. The source is closed on every exit path. Returns
/// the number of processed frames.
pub trait PipelineExecutor: Send {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        orchestrator: &mut FrameOrchestrator,
        logger: &mut dyn PipelineLogger,
        config: PipelineConfig,
    ) -> Result<u64, Box<dyn std::error::Error>>;
}
