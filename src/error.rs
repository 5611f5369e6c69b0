//! Error types for the debate-coach library.
//!
//! Each pipeline stage has its own error type so callers can branch on where
//! a review failed:
//!
//! * [`ExtractionError`] — the uploaded document could not be turned into
//!   text (wrong format, corrupt file, nothing readable).
//! * [`FeedbackError`] — the remote model did not return usable feedback.
//!   A non-2xx response is a [`FeedbackError::ApiStatus`], never text that
//!   looks like feedback.
//! * [`ExportError`] — the PDF report could not be written.
//!
//! [`CoachError`] wraps all three for the top-level `review*` functions.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the top-level review functions.
#[derive(Debug, Error)]
pub enum CoachError {
    /// Text extraction failed; the review stops before any API call.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The feedback request failed; no report is produced.
    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    /// Writing the PDF report failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not copy the report to the requested destination.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoachError {
    /// Stable, machine-readable tag for the failure (used by the JSON API).
    pub fn kind(&self) -> &'static str {
        match self {
            CoachError::Extraction(ExtractionError::UnsupportedFormat { .. }) => "unsupported_format",
            CoachError::Extraction(ExtractionError::TaskFailed(_)) => "internal",
            CoachError::Extraction(_) => "extraction",
            CoachError::Feedback(_) => "feedback",
            CoachError::Export(_) => "export",
            CoachError::InvalidConfig(_) => "config",
            CoachError::OutputWriteFailed { .. } => "output",
            CoachError::Internal(_) => "internal",
        }
    }
}

/// The document could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File extension is neither `.pdf` nor `.docx`.
    #[error("Unsupported file type '{name}': upload a .pdf or .docx file")]
    UnsupportedFormat { name: String },

    /// The extension promises one format but the bytes are another.
    #[error("'{name}' is not a valid {expected} file (first bytes: {magic:?})")]
    FormatMismatch {
        name: String,
        expected: &'static str,
        magic: Vec<u8>,
    },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt or unreadable: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password.
    #[error("PDF is password-protected; remove the protection and upload it again")]
    PasswordRequired,

    /// ZIP container or WordprocessingML part is malformed.
    #[error("DOCX is corrupt or unreadable: {detail}")]
    InvalidDocx { detail: String },

    /// Extraction succeeded but produced no text.
    #[error("Could not extract text. Please check the file.")]
    EmptyText,

    /// The blocking extraction task died before returning.
    #[error("Extraction task failed: {0}")]
    TaskFailed(String),

    /// Reading the local file failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The remote model did not return usable feedback.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// The API answered with a non-2xx status.
    #[error("Feedback API returned HTTP {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// Connection, TLS, or protocol failure before a response arrived.
    #[error("Feedback request failed: {0}")]
    Transport(String),

    /// The request exceeded `api_timeout_secs`.
    #[error("Feedback request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response body was not a chat-completion payload.
    #[error("Malformed feedback response: {0}")]
    MalformedResponse(String),

    /// The model answered with blank content.
    #[error("The model returned empty feedback")]
    EmptyResponse,

    /// The provider SDK reported an error.
    #[error("LLM provider '{provider}' failed: {detail}")]
    Provider { provider: String, detail: String },

    /// No credential or provider is available.
    #[error("Feedback transport is not configured.\n{hint}")]
    NotConfigured { hint: String },
}

/// The PDF report could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    /// lopdf rejected the content stream or document.
    #[error("Failed to encode PDF: {0}")]
    Encode(String),

    /// Creating or writing the temporary file failed.
    #[error("Failed to write PDF report: {0}")]
    Io(#[from] std::io::Error),
}
