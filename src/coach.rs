//! Review entry points: one uploaded document → feedback + PDF report.
//!
//! A review runs three stages in order and stops at the first failure:
//!
//! 1. extract the document's text (empty text is an error),
//! 2. request feedback on the first `max_input_chars` characters,
//! 3. export the feedback as a one-page PDF.
//!
//! A failed feedback request never produces a report: the caller gets
//! [`CoachError::Feedback`] and decides how to show it.

use crate::config::CoachConfig;
use crate::error::CoachError;
use crate::output::{ReviewOutput, ReviewStats};
use crate::pipeline::input::UploadedDocument;
use crate::pipeline::{export, extract, llm};
use crate::progress::Stage;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Review an uploaded document.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use debate_coach::{review, CoachConfig, UploadedDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("round3.docx")?;
/// let document = UploadedDocument::from_upload("round3.docx", bytes)?;
/// let output = review(document, &CoachConfig::from_env()?).await?;
/// println!("{}", output.feedback.content);
/// output.artifact.save_to("Debate_Feedback.pdf").await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - [`CoachError::Extraction`] when the document yields no text
/// - [`CoachError::Feedback`] when the model call fails; no report is written
/// - [`CoachError::Export`] when the report cannot be written
pub async fn review(
    document: UploadedDocument,
    config: &CoachConfig,
) -> Result<ReviewOutput, CoachError> {
    let total_start = Instant::now();
    info!("Starting review: {} ({})", document.name, document.format);

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let stage_start = start_stage(config, Stage::Extract);
    let text = match extract::extract_text(document).await {
        Ok(text) => text,
        Err(e) => return Err(fail_stage(config, Stage::Extract, e.into())),
    };
    let extract_duration_ms = finish_stage(config, Stage::Extract, stage_start);

    // ── Step 2: Request feedback ─────────────────────────────────────────
    let stage_start = start_stage(config, Stage::Feedback);
    let feedback = match llm::request_feedback(&text, config).await {
        Ok(feedback) => feedback,
        Err(e) => return Err(fail_stage(config, Stage::Feedback, e.into())),
    };
    let feedback_duration_ms = finish_stage(config, Stage::Feedback, stage_start);

    // ── Step 3: Export report ────────────────────────────────────────────
    let stage_start = start_stage(config, Stage::Export);
    let content = feedback.content.clone();
    let layout = config.layout;
    let exported = tokio::task::spawn_blocking(move || export::export_to_pdf(&content, &layout))
        .await
        .map_err(|e| CoachError::Internal(format!("Export task panicked: {e}")))
        .and_then(|r| r.map_err(CoachError::from));
    let artifact = match exported {
        Ok(artifact) => artifact,
        Err(e) => return Err(fail_stage(config, Stage::Export, e)),
    };
    let export_duration_ms = finish_stage(config, Stage::Export, stage_start);

    let stats = ReviewStats {
        extracted_chars: text.chars().count(),
        submitted_chars: feedback.submitted_chars,
        extract_duration_ms,
        feedback_duration_ms,
        export_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Review complete: {} chars of feedback, {} report lines, {}ms total",
        feedback.content.len(),
        artifact.line_count(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_review_complete(feedback.content.len(), stats.total_duration_ms);
    }

    Ok(ReviewOutput {
        feedback,
        artifact,
        stats,
    })
}

/// Review a local `.pdf` or `.docx` file.
pub async fn review_file(
    path: impl AsRef<Path>,
    config: &CoachConfig,
) -> Result<ReviewOutput, CoachError> {
    let document = UploadedDocument::from_path(path).await?;
    review(document, config).await
}

/// Review a local file and write the report to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. The
/// temporary report is removed once copied.
pub async fn review_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &CoachConfig,
) -> Result<ReviewOutput, CoachError> {
    let output = review_file(path, config).await?;
    let dest = output_path.as_ref();

    output
        .artifact
        .save_to(dest)
        .await
        .map_err(|e| CoachError::OutputWriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

    info!("Report written to {}", dest.display());
    Ok(output)
}

/// Synchronous wrapper around [`review_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn review_sync(
    path: impl AsRef<Path>,
    config: &CoachConfig,
) -> Result<ReviewOutput, CoachError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CoachError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(review_file(path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn start_stage(config: &CoachConfig, stage: Stage) -> Instant {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
    Instant::now()
}

fn finish_stage(config: &CoachConfig, stage: Stage, start: Instant) -> u64 {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!("Stage {} finished in {}ms", stage, elapsed_ms);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
    elapsed_ms
}

fn fail_stage(config: &CoachConfig, stage: Stage, error: CoachError) -> CoachError {
    warn!("Stage {} failed: {}", stage, error);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_error(stage, &error.to_string());
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ReviewProgressCallback;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use zip::write::SimpleFileOptions;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ReviewProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.events.lock().unwrap().push(format!("done:{stage}"));
        }
        fn on_stage_error(&self, stage: Stage, _error: &str) {
            self.events.lock().unwrap().push(format!("error:{stage}"));
        }
    }

    fn blank_docx() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p></w:p><w:p><w:r><w:t>   </w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[tokio::test]
    async fn empty_document_stops_before_feedback() {
        let recorder = Arc::new(Recorder::default());
        // Unreachable base: reaching the feedback stage would fail with a transport error.
        let config = CoachConfig::builder()
            .api_base_url("http://127.0.0.1:9/v1")
            .api_key("sk-unused")
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        let document = UploadedDocument::from_upload("blank.docx", blank_docx()).unwrap();
        let err = review(document, &config).await.unwrap_err();

        assert_eq!(err.kind(), "extraction");
        assert_eq!(err.to_string(), "Could not extract text. Please check the file.");
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start:extract", "error:extract"]);
    }

    #[tokio::test]
    async fn unsupported_file_is_rejected_before_reading() {
        let err = review_file("/nowhere/notes.txt", &CoachConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_format");
    }
}
