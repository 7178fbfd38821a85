use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::pipeline::frame_orchestrator::FrameOrchestrator;
use crate::pipeline::pipeline_executor::{PipelineConfig, PipelineExecutor};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::FRAME_POLL_DELAY_MS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::{FrameGrab, FrameSource};

const DEFAULT_CHANNEL_CAPACITY: usize = 2;

/// Executes the frame loop with a dedicated capture thread.
///
/// Layout: `capture → main [orchestrate → callback]`
///
/// Decoding the next frame overlaps with processing the current one. With
/// `drop_stale` set, the capture thread discards frames while the main
/// loop is busy instead of blocking, which keeps a live camera feed close
/// to real time at the cost of skipped frames.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
    drop_stale: bool,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            drop_stale: false,
        }
    }

    pub fn with_drop_stale(mut self, drop_stale: bool) -> Self {
        self.drop_stale = drop_stale;
        self
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        source: Box<dyn FrameSource>,
        orchestrator: &mut FrameOrchestrator,
        logger: &mut dyn PipelineLogger,
        mut config: PipelineConfig,
    ) -> Result<u64, Box<dyn std::error::Error>> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(self.channel_capacity.max(1));
        let stop = Arc::new(AtomicBool::new(false));

        let capture_handle = spawn_capture(
            source,
            frame_tx,
            config.cancelled.clone(),
            stop.clone(),
            self.drop_stale,
        );

        let processed = run_main_loop(&frame_rx, orchestrator, logger, &mut config);

        stop.store(true, Ordering::Relaxed);
        drop(frame_rx);
        capture_handle
            .join()
            .map_err(|_| "capture thread panicked")?;

        logger.summary();
        Ok(processed)
    }
}

fn spawn_capture(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Frame>,
    cancelled: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    drop_stale: bool,
) -> thread::JoinHandle<()> {
    let poll_delay = Duration::from_millis(FRAME_POLL_DELAY_MS);
    thread::spawn(move || {
        while !cancelled.load(Ordering::Relaxed) && !stop.load(Ordering::Relaxed) {
            let frame = match source.grab_frame() {
                Ok(FrameGrab::Frame(frame)) => frame,
                Ok(FrameGrab::Empty) => {
                    thread::sleep(poll_delay);
                    continue;
                }
                Ok(FrameGrab::Ended) => break,
                Err(e) => {
                    log::warn!("Frame grab failed: {e}");
                    thread::sleep(poll_delay);
                    continue;
                }
            };

            if drop_stale {
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log::trace!("Dropping stale frame"),
                    Err(TrySendError::Disconnected(_)) => break,
                }
            } else if frame_tx.send(frame).is_err() {
                break;
            }
        }
        source.close();
    })
}

fn run_main_loop(
    frame_rx: &Receiver<Frame>,
    orchestrator: &mut FrameOrchestrator,
    logger: &mut dyn PipelineLogger,
    config: &mut PipelineConfig,
) -> u64 {
    let mut processed = 0u64;

    for frame in frame_rx {
        if config.cancelled.load(Ordering::Relaxed) {
            break;
        }
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
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::infrastructure::test_support::{orchestrator, FrameGrabStep, ScriptedSource};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use std::sync::Mutex;

    fn config() -> PipelineConfig {
        PipelineConfig::new(Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_processes_every_frame_in_order() {
        let (source, closed) = ScriptedSource::frames(12);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let config = config().with_on_frame(Box::new(move |report| {
            seen_cb.lock().unwrap().push(report.index);
            true
        }));

        let mut orch = orchestrator(3);
        let processed = ThreadedPipelineExecutor::new()
            .execute(Box::new(source), &mut orch, &mut NullPipelineLogger, config)
            .unwrap();

        assert_eq!(processed, 12);
        assert_eq!(*seen.lock().unwrap(), (1..=12).collect::<Vec<u64>>());
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_skips_empty_grabs_and_errors() {
        let (source, _) = ScriptedSource::with_script(vec![
            FrameGrabStep::Fail,
            FrameGrabStep::Frame,
            FrameGrabStep::Empty,
            FrameGrabStep::Frame,
        ]);
        let mut orch = orchestrator(1);
        let processed = ThreadedPipelineExecutor::new()
            .execute(Box::new(source), &mut orch, &mut NullPipelineLogger, config())
            .unwrap();
        assert_eq!(processed, 2);
    }

    #[test]
    fn test_callback_stop_shuts_down_capture() {
        let (source, closed) = ScriptedSource::frames(100);
        let config = config().with_on_frame(Box::new(|report| report.index < 4));

        let mut orch = orchestrator(1);
        let processed = ThreadedPipelineExecutor::new()
            .execute(Box::new(source), &mut orch, &mut NullPipelineLogger, config)
            .unwrap();

        assert_eq!(processed, 4);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_drop_stale_still_delivers_frames() {
        let (source, _) = ScriptedSource::frames(30);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let config = config().with_on_frame(Box::new(move |report| {
            seen_cb.lock().unwrap().push(report.index);
            true
        }));

        let mut orch = orchestrator(1);
        let processed = ThreadedPipelineExecutor::new()
            .with_drop_stale(true)
            .execute(Box::new(source), &mut orch, &mut NullPipelineLogger, config)
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!((1..=30).contains(&processed));
        assert_eq!(seen.len() as u64, processed);
    }
}
