//! Pipeline stages of a review.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ postprocess ──▶ export
//! (upload)  (pdf/docx)  (chat)   (cleanup)      (lopdf)
//! ```
//!
//! 1. [`input`]   — accept an upload or local path, check its declared format
//! 2. [`extract`] — plain text from the PDF or DOCX; runs in `spawn_blocking`
//!    because both parsers are synchronous
//! 3. [`llm`]     — the single feedback request; the only stage with network I/O
//! 4. [`postprocess`] — strip layout noise from the model's answer
//! 5. [`export`]  — write the feedback as a one-page PDF in temporary storage

pub mod export;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
