//! # debate-coach
//!
//! AI feedback for debate speeches and case files.
//!
//! Upload a `.pdf` or `.docx`, get back bullet-point critique from a chat
//! model (rebuttable claims, weak arguments, unsupported assumptions) and a
//! one-page PDF report of that critique.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX
//!  │
//!  ├─ 1. Input    declared format from the extension, magic bytes checked
//!  ├─ 2. Extract  pdfium (lopdf fallback) or the DOCX body paragraphs
//!  ├─ 3. Feedback first 3000 chars → one chat-completion request
//!  ├─ 4. Polish   strip fences and layout noise from the answer
//!  └─ 5. Export   Helvetica text on one Letter page, in a temp file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use debate_coach::{review_file, CoachConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key from DEBATE_COACH_API_KEY or OPENAI_API_KEY
//!     let config = CoachConfig::from_env()?;
//!     let output = review_file("constructive.docx", &config).await?;
//!     println!("{}", output.feedback.content);
//!     output.artifact.save_to("Debate_Feedback.pdf").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `debate-coach` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables [`server`], the axum web UI |
//!
//! Disable both when using only the library:
//! ```toml
//! debate-coach = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod coach;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use coach::{review, review_file, review_sync, review_to_file};
pub use config::{CoachConfig, CoachConfigBuilder, PdfLayout};
pub use error::{CoachError, ExportError, ExtractionError, FeedbackError};
pub use output::{Feedback, PdfArtifact, ReviewOutput, ReviewStats, REPORT_FILE_NAME, REPORT_MIME};
pub use pipeline::input::{DocumentFormat, UploadedDocument};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback, Stage};
