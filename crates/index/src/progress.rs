//! Structured progress reporting for video processing.
//!
//! Captioning and embedding can take minutes for a long video; the pipeline
//! emits one event per phase step so callers can render progress.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during processing.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase: "save", "sample", "caption", "transcribe", "index", "register"
    pub phase: String,

    /// Work done so far within the phase
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(phase: impl Into<String>, current: u64, total: Option<u64>, message: impl Into<String>) -> Self {
        let percentage = total.map(|t| if t > 0 { (current as f64 / t as f64) * 100.0 } else { 0.0 });

        Self {
            phase: phase.into(),
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a single user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => format!("{}", self.current),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        callback(event);
    }

    pub fn save(&self, video: &str) {
        self.emit(ProgressEvent::new("save", 0, None, format!("storing {}", video)));
    }

    pub fn sample(&self, frames: u64, mode: &str) {
        self.emit(ProgressEvent::new("sample", frames, None, format!("{} frames ({})", frames, mode)));
    }

    pub fn caption(&self, current: u64, total: u64) {
        self.emit(ProgressEvent::new(
            "caption",
            current,
            Some(total),
            format!("captioning frame {}/{}", current, total),
        ));
    }

    pub fn transcribe(&self, segments: u64) {
        self.emit(ProgressEvent::new(
            "transcribe",
            segments,
            None,
            format!("{} speech segments", segments),
        ));
    }

    pub fn index(&self, current: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "index",
            current,
            Some(total),
            format!("embedding with {}", model),
        ));
    }

    pub fn register(&self, video_id: &str) {
        self.emit(ProgressEvent::new("register", 1, Some(1), format!("video {} ready", video_id)));
    }
}
