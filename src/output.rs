//! Result types of a review.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// File name offered to the user when downloading the report.
pub const REPORT_FILE_NAME: &str = "Debate_Feedback.pdf";

/// MIME type of the report.
pub const REPORT_MIME: &str = "application/pdf";

/// Feedback returned by the model, after layout cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    /// Bullet-style critique text.
    pub content: String,
    /// Model that produced it.
    pub model: String,
    /// `"http"` or the provider name.
    pub transport: String,
    /// Characters of document text actually sent.
    pub submitted_chars: usize,
    /// Whether the document was cut to `max_input_chars`.
    pub truncated: bool,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub duration_ms: u64,
}

/// The generated PDF report in temporary storage.
///
/// Owns its file: dropping the artifact deletes it. Deliver it with
/// [`PdfArtifact::read_bytes`] or [`PdfArtifact::save_to`], or call
/// [`PdfArtifact::keep`] to leave it on disk.
#[derive(Debug)]
pub struct PdfArtifact {
    path: TempPath,
    line_count: usize,
}

impl PdfArtifact {
    pub(crate) fn new(path: TempPath, line_count: usize) -> Self {
        Self { path, line_count }
    }

    /// Location of the temporary PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of text lines written to the page.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Read the whole PDF into memory.
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&*self.path).await
    }

    /// Copy the PDF to `dest` atomically (temp file + rename).
    pub async fn save_to(&self, dest: impl AsRef<Path>) -> std::io::Result<()> {
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = dest.with_extension("pdf.tmp");
        let written = match tokio::fs::copy(&*self.path, &tmp).await {
            Ok(_) => tokio::fs::rename(&tmp, dest).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }

    /// Disable cleanup and return the path of the kept file.
    pub fn keep(self) -> std::io::Result<PathBuf> {
        self.path.keep().map_err(|e| e.error)
    }
}

/// Timings and sizes of one review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewStats {
    /// Characters of text extracted from the document.
    pub extracted_chars: usize,
    /// Characters sent to the model after truncation.
    pub submitted_chars: usize,
    pub extract_duration_ms: u64,
    pub feedback_duration_ms: u64,
    pub export_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful review produces.
#[derive(Debug)]
pub struct ReviewOutput {
    pub feedback: Feedback,
    pub artifact: PdfArtifact,
    pub stats: ReviewStats,
}
