//! Progress reporting service
//!
//! Separates progress reporting from the processing stages so the CLI, the
//! bot and tests can each observe a sticker run their own way.

use crate::types::ProcessingTimings;
use instant::Instant;
use std::sync::{Arc, Mutex};

/// Stages a single image passes through
///
/// `Encoded` repeats once per size-fit attempt with strictly decreasing
/// quality. A run ends in exactly one of `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Raw bytes accepted
    Received,
    /// Bytes decoded to an RGBA raster
    Decoded,
    /// Background pixels made transparent
    BackgroundRemoved,
    /// Scaled to fit the dimension limit
    Resized,
    /// One encode attempt finished
    Encoded { quality: u8, bytes: usize },
    /// An attempt fit the byte limit
    Done,
    /// Decoding or compositing failed
    Failed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Received => "Receiving image",
            ProcessingStage::Decoded => "Decoded image",
            ProcessingStage::BackgroundRemoved => "Removed background",
            ProcessingStage::Resized => "Resized to sticker bounds",
            ProcessingStage::Encoded { .. } => "Encoded candidate",
            ProcessingStage::Done => "Sticker ready",
            ProcessingStage::Failed => "Processing failed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::Received => 0,
            ProcessingStage::Decoded => 15,
            ProcessingStage::BackgroundRemoved => 50,
            ProcessingStage::Resized => 65,
            ProcessingStage::Encoded { .. } => 85,
            ProcessingStage::Done | ProcessingStage::Failed => 100,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStage::Done | ProcessingStage::Failed)
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        let description = match &stage {
            ProcessingStage::Encoded { quality, bytes } => {
                format!("{} (quality {}, {} bytes)", stage.description(), quality, bytes)
            },
            other => other.description().to_string(),
        };
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            description,
            stage,
        }
    }
}

/// Trait for observing sticker processing
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: &ProcessingTimings);

    /// Report an error during processing
    fn report_error(&self, stage: &ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: &ProcessingStage, _error: &str) {}
}

/// Console progress reporter that logs progress through `log`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}ms elapsed)",
                update.progress,
                update.description,
                update.elapsed_ms
            );
        } else {
            log::debug!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        log::info!("✅ Sticker completed in {}ms", timings.total_ms);

        if self.verbose {
            log::info!("  📊 Detailed timings:");
            log::info!("    • Decode: {}ms", timings.decode_ms);
            log::info!("    • Background removal: {}ms", timings.removal_ms);
            log::info!("    • Resize: {}ms", timings.resize_ms);
            log::info!("    • Encode: {}ms", timings.encode_ms);
        }
    }

    fn report_error(&self, stage: &ProcessingStage, error: &str) {
        log::error!("❌ Error after '{}': {}", stage.description(), error);
    }
}

/// Reporter that keeps every stage it sees, for assertions and diagnostics
#[derive(Debug, Default)]
pub struct RecordingProgressReporter {
    stages: Mutex<Vec<ProcessingStage>>,
    errors: Mutex<Vec<String>>,
    completions: Mutex<usize>,
}

impl RecordingProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stages(&self) -> Vec<ProcessingStage> {
        self.stages.lock().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn completions(&self) -> usize {
        self.completions.lock().map(|c| *c).unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if let Ok(mut stages) = self.stages.lock() {
            stages.push(update.stage);
        }
    }

    fn report_completion(&self, _timings: &ProcessingTimings) {
        if let Ok(mut completions) = self.completions.lock() {
            *completions += 1;
        }
    }

    fn report_error(&self, _stage: &ProcessingStage, error: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error.to_string());
        }
    }
}

/// Per-image tracker that owns the start time and current stage
pub struct ProgressTracker {
    reporter: Arc<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    /// Create a progress tracker with no-op reporter
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Arc::new(NoOpProgressReporter))
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage.clone());
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: &ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report the error against the last stage reached, then move to `Failed`
    pub fn report_failure(&mut self, error: &str) {
        let stage = self
            .current_stage
            .clone()
            .unwrap_or(ProcessingStage::Received);
        self.reporter.report_error(&stage, error);
        self.report_stage(ProcessingStage::Failed);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<&ProcessingStage> {
        self.current_stage.as_ref()
    }
}
