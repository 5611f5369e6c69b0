//! Web UI: upload a speech, read the feedback, download the report.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/` | GET | upload form (`.pdf`, `.docx`) |
//! | `/review` | POST | HTML page with the feedback and a download link |
//! | `/api/review` | POST | JSON `{feedback, stats, pdf_base64}` or `{error, kind}` |
//! | `/api/review/pdf` | POST | `Debate_Feedback.pdf` attachment |
//! | `/api/health` | GET | `OK` |
//!
//! Uploads are multipart with the document in the `file` field. Reviews run
//! one at a time behind a single-permit gate; later requests wait their turn.

use crate::coach::review;
use crate::config::CoachConfig;
use crate::error::{CoachError, ExportError, ExtractionError};
use crate::output::{Feedback, ReviewStats, REPORT_FILE_NAME, REPORT_MIME};
use crate::pipeline::input::UploadedDocument;
use crate::progress::{ProgressCallback, ReviewProgressCallback, Stage};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const UPLOAD_FIELD: &str = "file";

/// Shared state of all routes.
#[derive(Clone)]
pub struct AppState {
    config: Arc<CoachConfig>,
    gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(mut config: CoachConfig) -> Self {
        if config.progress_callback.is_none() {
            config.progress_callback = Some(Arc::new(LogProgress) as ProgressCallback);
        }
        Self {
            config: Arc::new(config),
            gate: Arc::new(Mutex::new(())),
        }
    }
}

/// Logs stage events for the web UI.
struct LogProgress;

impl ReviewProgressCallback for LogProgress {
    fn on_stage_start(&self, stage: Stage) {
        info!("{}...", stage.label());
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        debug!("{} done in {}ms", stage, elapsed_ms);
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        warn!("{} failed: {}", stage, error);
    }
}

/// Build the router for `config`.
pub fn router(config: CoachConfig) -> Router {
    let limit = config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/review", post(review_page))
        .route("/api/review", post(review_json))
        .route("/api/review/pdf", post(review_pdf))
        .route("/api/health", get(|| async { "OK" }))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(AppState::new(config))
}

/// Serve the web UI on `addr` until the process is stopped.
#[instrument(skip(config))]
pub async fn serve(addr: SocketAddr, config: CoachConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("Debate coach listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(config)).await
}

// ── Errors ───────────────────────────────────────────────────────────────

/// A failed request, rendered as JSON or as an HTML banner.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl ApiError {
    fn missing_file() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: format!("Attach a .pdf or .docx file in the '{UPLOAD_FIELD}' field"),
        }
    }
}

impl From<CoachError> for ApiError {
    fn from(err: CoachError) -> Self {
        Self {
            status: status_for(&err),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        Self {
            status,
            kind: if status == StatusCode::PAYLOAD_TOO_LARGE {
                "too_large"
            } else {
                "bad_request"
            },
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

/// HTTP status for a review failure.
pub fn status_for(err: &CoachError) -> StatusCode {
    match err {
        CoachError::Extraction(ExtractionError::UnsupportedFormat { .. }) => {
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        }
        CoachError::Extraction(ExtractionError::TaskFailed(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        CoachError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoachError::Feedback(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Review ───────────────────────────────────────────────────────────────

struct Reviewed {
    feedback: Feedback,
    stats: ReviewStats,
    pdf: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadedDocument, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if name.is_empty() || bytes.is_empty() {
            return Err(ApiError::missing_file());
        }
        return UploadedDocument::from_upload(name, bytes.to_vec())
            .map_err(|e| ApiError::from(CoachError::from(e)));
    }
    Err(ApiError::missing_file())
}

/// Run one review behind the gate and load the report into memory.
///
/// The temporary report is deleted before this returns.
async fn run_review(state: &AppState, document: UploadedDocument) -> Result<Reviewed, ApiError> {
    let _permit = state.gate.lock().await;
    let output = review(document, &state.config).await?;
    let pdf = output
        .artifact
        .read_bytes()
        .await
        .map_err(|e| CoachError::from(ExportError::from(e)))?;
    Ok(Reviewed {
        feedback: output.feedback,
        stats: output.stats,
        pdf,
    })
}

async fn upload_and_review(state: &AppState, multipart: Multipart) -> Result<Reviewed, ApiError> {
    let document = read_upload(multipart).await?;
    run_review(state, document).await
}

#[derive(Serialize)]
struct ReviewBody {
    feedback: Feedback,
    stats: ReviewStats,
    pdf_base64: String,
}

async fn review_json(State(state): State<AppState>, multipart: Multipart) -> Response {
    match upload_and_review(&state, multipart).await {
        Ok(reviewed) => Json(ReviewBody {
            feedback: reviewed.feedback,
            stats: reviewed.stats,
            pdf_base64: STANDARD.encode(&reviewed.pdf),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn review_pdf(State(state): State<AppState>, multipart: Multipart) -> Response {
    match upload_and_review(&state, multipart).await {
        Ok(reviewed) => (
            [
                (header::CONTENT_TYPE, REPORT_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
                ),
            ],
            reviewed.pdf,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn review_page(State(state): State<AppState>, multipart: Multipart) -> Response {
    match upload_and_review(&state, multipart).await {
        Ok(reviewed) => Html(result_page(&reviewed)).into_response(),
        Err(err) => (err.status, Html(page(Some(&err.message), ""))).into_response(),
    }
}

async fn index() -> Html<String> {
    Html(page(None, ""))
}

// ── HTML ─────────────────────────────────────────────────────────────────

fn result_page(reviewed: &Reviewed) -> String {
    let note = if reviewed.feedback.truncated {
        format!(
            "<p class=\"note\">Only the first {} characters were reviewed.</p>",
            reviewed.feedback.submitted_chars
        )
    } else {
        String::new()
    };
    let body = format!(
        "<h2>Feedback</h2>{note}<pre>{}</pre>\
         <p><a class=\"download\" href=\"data:{REPORT_MIME};base64,{}\" download=\"{REPORT_FILE_NAME}\">\
         Download Feedback PDF</a></p>",
        escape_html(&reviewed.feedback.content),
        STANDARD.encode(&reviewed.pdf),
    );
    page(None, &body)
}

fn page(error: Option<&str>, body: &str) -> String {
    let banner = error
        .map(|msg| format!("<div class=\"error\">{}</div>", escape_html(msg)))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Debate Coach</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
pre {{ white-space: pre-wrap; background: #f6f6f6; padding: 1rem; }}
.error {{ background: #fde8e8; color: #9b1c1c; padding: 0.75rem 1rem; margin-bottom: 1rem; }}
.note {{ color: #555; }}
</style>
</head>
<body>
<h1>Debate Coach</h1>
<p>Upload a debate speech or case file for AI feedback.</p>
{banner}
<form action="/review" method="post" enctype="multipart/form-data">
<input type="file" name="{UPLOAD_FIELD}" accept=".pdf,.docx" required>
<button type="submit">Get feedback</button>
</form>
{body}
</body>
</html>
"#
    )
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
