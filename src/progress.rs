//! Progress-callback trait for per-stage review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::CoachConfigBuilder::progress_callback`] to learn when each
//! stage (extract, feedback, export) starts and finishes. The CLI drives a
//! spinner from these events; the web UI logs them.
//!
//! # Example
//!
//! ```rust
//! use debate_coach::{CoachConfig, ReviewProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ReviewProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{} done in {elapsed_ms}ms", stage.label());
//!     }
//! }
//!
//! let config = CoachConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One step of the review pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Uploaded bytes → plain text.
    Extract,
    /// Plain text → model feedback.
    Feedback,
    /// Feedback → PDF report.
    Export,
}

impl Stage {
    /// Status line shown while the stage runs.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Extract => "Uploading and extracting text",
            Stage::Feedback => "Analyzing arguments",
            Stage::Export => "Generating PDF",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Feedback => "feedback",
            Stage::Export => "export",
        })
    }
}

/// Called by the review pipeline as it moves through each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage succeeds.
    ///
    /// # Arguments
    /// * `stage`      — the stage that finished
    /// * `elapsed_ms` — wall-clock time spent in the stage
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails; the review stops afterwards.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the report has been written.
    ///
    /// # Arguments
    /// * `feedback_len` — byte length of the feedback text
    /// * `total_ms`     — wall-clock time of the whole review
    fn on_review_complete(&self, feedback_len: usize, total_ms: u64) {
        let _ = (feedback_len, total_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CoachConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;
