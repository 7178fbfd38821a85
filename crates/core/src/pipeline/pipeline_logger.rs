use std::collections::BTreeMap;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples the frame loop from specific output mechanisms (stdout,
/// log crate) so each caller can observe pipeline behavior without changing
/// the orchestration code.
pub trait PipelineLogger: Send {
    /// Report that frame `index` (1-based) finished processing.
    fn frame_done(&mut self, index: u64);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. tracked faces, detections).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. The watch worker reports through frame events instead.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_done(&mut self, _index: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one stage or metric.
///
/// A camera session has no natural end, so samples are folded in as they
/// arrive rather than kept.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub count: u64,
    pub total: f64,
    pub peak: f64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        if self.count == 0 || value > self.peak {
            self.peak = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Console logger for the blocking `run` mode.
///
/// Logs a rate line every `every_frames` frames and prints a per-stage
/// breakdown when the session stops.
pub struct StdoutPipelineLogger {
    every_frames: u64,
    stages: BTreeMap<String, Tally>,
    gauges: BTreeMap<String, Tally>,
    started: Instant,
    last_frame: u64,
}

impl StdoutPipelineLogger {
    pub fn new(every_frames: u64) -> Self {
        Self {
            every_frames: every_frames.max(1),
            stages: BTreeMap::new(),
            gauges: BTreeMap::new(),
            started: Instant::now(),
            last_frame: 0,
        }
    }

    pub fn stage(&self, name: &str) -> Option<Tally> {
        self.stages.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<Tally> {
        self.gauges.get(name).copied()
    }

    pub fn frames(&self) -> u64 {
        self.last_frame
    }

    /// Summary text, `None` until something has been recorded.
    pub fn report(&self) -> Option<String> {
        self.render(self.started.elapsed().as_secs_f64())
    }

    fn render(&self, elapsed_secs: f64) -> Option<String> {
        if self.stages.is_empty() && self.gauges.is_empty() {
            return None;
        }

        let mut out = format!(
            "Session: {} frames in {elapsed_secs:.1}s",
            self.last_frame
        );
        if self.last_frame > 0 && elapsed_secs > 0.0 {
            out.push_str(&format!(
                " ({:.1} fps)",
                self.last_frame as f64 / elapsed_secs
            ));
        }

        for (name, tally) in &self.stages {
            out.push_str(&format!(
                "\n  {name:10} mean {:6.1}ms  peak {:6.1}ms  over {} frames",
                tally.mean(),
                tally.peak,
                tally.count
            ));
        }
        for (name, tally) in &self.gauges {
            out.push_str(&format!(
                "\n  {name:10} mean {:.1}  peak {:.0}",
                tally.mean(),
                tally.peak
            ));
        }
        Some(out)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_done(&mut self, index: u64) {
        self.last_frame = self.last_frame.max(index);
        if index % self.every_frames != 0 {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        if secs > 0.0 {
            log::info!("Frame {index} ({:.1} fps)", index as f64 / secs);
        } else {
            log::info!("Frame {index}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages.entry(stage.to_owned()).or_default().add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.gauges.entry(name.to_owned()).or_default().add(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.report() {
            log::info!("\n{text}");
        }
    }
}
