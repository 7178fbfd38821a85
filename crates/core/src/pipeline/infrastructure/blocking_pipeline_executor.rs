use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use crate::pipeline::frame_orchestrator::FrameOrchestrator;
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::FRAME_POLL_DELAY_MS;
use crate::video::domain::frame_source::{FrameGrab, FrameSource};

/// Grabs and processes frames one after another on the calling thread.
pub struct BlockingPipelineExecutor {
    poll_delay: Duration,
}

impl BlockingPipelineExecutor {
    pub fn new() -> Self {
        Self {
            poll_delay: Duration::from_millis(FRAME_POLL_DELAY_MS),
        }
    }
}

impl Default for BlockingPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for BlockingPipelineExecutor {
    fn execute(
        &self,
        mut source: Box<dyn FrameSource>,
        orchestrator: &mut FrameOrchestrator,
        logger: &mut dyn PipelineLogger,
        mut config: PipelineConfig,
    ) -> Result<u64, Box<dyn std::error::Error>> {
        let mut processed = 0u64;

        while !config.cancelled.load(Ordering::Relaxed) {
            let frame = match source.grab_frame() {
                Ok(FrameGrab::Frame(frame)) => frame,
                Ok(FrameGrab::Empty) => {
                    thread::sleep(self.poll_delay);
                    continue;
                }
                Ok(FrameGrab::Ended) => break,
                Err(e) => {
                    log::warn!("Frame grab failed: {e}");
                    thread::sleep(self.poll_delay);
                    continue;
                }
            };

            let Some(report) = orchestrator.process(&frame, logger) else {
                continue;
            };
            processed += 1;

            if let Some(on_frame) = config.on_frame.as_mut() {
                if !on_frame(report) {
                    break;
                }
            }
        }

        source.close();
        logger.summary();
        Ok(processed)
    }
}
