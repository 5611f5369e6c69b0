//! Text extraction: uploaded PDF or DOCX bytes → plain text.
//!
//! ## PDF engines
//!
//! pdfium (via `pdfium-render`) is the primary engine: it handles odd fonts
//! and encodings far better than a pure-Rust parser. It needs the native
//! library at runtime, located through `PDFIUM_LIB_PATH` (file or directory)
//! or the system loader path. When no library can be bound, or pdfium
//! rejects the file for a reason other than a password, `lopdf` extracts the
//! text instead so the review still works on a bare machine.
//!
//! Both engines produce one string per page; [`join_pages`] concatenates them
//! in page order.
//!
//! ## DOCX
//!
//! A DOCX is a ZIP container; the body lives in `word/document.xml`. Body
//! paragraphs (`w:p`) are read in document order. Paragraphs inside tables
//! and text boxes are skipped, matching "paragraphs only, no structure".
//!
//! Only that one part is inflated, and never past
//! [`MAX_DOCUMENT_PART_BYTES`]: a small upload must not expand into an
//! unbounded allocation.

use crate::error::ExtractionError;
use crate::pipeline::input::{DocumentFormat, UploadedDocument};
use pdfium_render::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Extract the trimmed plain text of a document.
///
/// Parsing is CPU-bound and pdfium is not async-safe, so the work runs on
/// the blocking pool. The document is consumed and dropped once its text is
/// out.
///
/// # Errors
/// [`ExtractionError::EmptyText`] when the document parses but holds no
/// text, plus format-specific parse errors.
pub async fn extract_text(document: UploadedDocument) -> Result<String, ExtractionError> {
    let name = document.name.clone();
    let format = document.format;

    let text = tokio::task::spawn_blocking(move || extract_text_blocking(&document))
        .await
        .map_err(|e| ExtractionError::TaskFailed(e.to_string()))??;

    info!("Extracted {} chars from {} '{}'", text.chars().count(), format, name);
    Ok(text)
}

/// Blocking implementation of [`extract_text`].
pub fn extract_text_blocking(document: &UploadedDocument) -> Result<String, ExtractionError> {
    let text = match document.format {
        DocumentFormat::Pdf => extract_pdf(&document.bytes)?,
        DocumentFormat::Docx => extract_docx(&document.bytes)?,
    };

    if text.is_empty() {
        return Err(ExtractionError::EmptyText);
    }
    Ok(text)
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// Extract the text of every page in order, then trim.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    match bind_pdfium() {
        Ok(pdfium) => match pages_with_pdfium(&pdfium, bytes) {
            Ok(pages) => return Ok(join_pages(&pages)),
            Err(ExtractionError::PasswordRequired) => return Err(ExtractionError::PasswordRequired),
            Err(e) => warn!("pdfium could not read the PDF, falling back to lopdf: {e}"),
        },
        Err(reason) => debug!("pdfium unavailable ({reason}); using lopdf"),
    }

    let pages = pages_with_lopdf(bytes)?;
    Ok(join_pages(&pages))
}

/// Concatenate page texts in order and trim the result.
///
/// A newline is inserted between pages when the previous page does not end
/// in whitespace, so the last word of one page never fuses with the first
/// word of the next.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut text = String::new();
    for page in pages {
        let page = page.as_ref();
        if !text.is_empty() && !text.ends_with(char::is_whitespace) && !page.is_empty() {
            text.push('\n');
        }
        text.push_str(page);
    }
    text.trim().to_string()
}

/// Bind to a pdfium library: `PDFIUM_LIB_PATH` first, then the system path.
fn bind_pdfium() -> Result<Pdfium, String> {
    if let Ok(configured) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(&configured);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        match Pdfium::bind_to_library(&lib) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => warn!("Failed to bind pdfium at {}: {:?}", lib.display(), e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("{e:?}"))
}

fn pages_with_pdfium(pdfium: &Pdfium, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            ExtractionError::PasswordRequired
        } else {
            ExtractionError::CorruptPdf { detail: err_str }
        }
    })?;

    let pages = document.pages();
    debug!("pdfium loaded PDF: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| ExtractionError::CorruptPdf {
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        texts.push(text.all());
    }
    Ok(texts)
}

fn pages_with_lopdf(bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::CorruptPdf {
        detail: e.to_string(),
    })?;

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractionError::PasswordRequired);
    }

    let pages = doc.get_pages();
    debug!("lopdf loaded PDF: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len());
    for page_num in pages.keys() {
        let text = doc
            .extract_text(&[*page_num])
            .map_err(|e| ExtractionError::CorruptPdf {
                detail: format!("page {page_num}: {e}"),
            })?;
        texts.push(text);
    }
    Ok(texts)
}

// ── DOCX ─────────────────────────────────────────────────────────────────

const DOCUMENT_PART: &str = "word/document.xml";

/// Largest uncompressed `word/document.xml` accepted (32 MiB).
pub const MAX_DOCUMENT_PART_BYTES: u64 = 32 * 1024 * 1024;

/// Extract non-blank body paragraphs joined by `\n`, trimmed.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let xml = read_document_part(bytes, MAX_DOCUMENT_PART_BYTES)?;

    let paragraphs = docx_paragraphs(&xml)?;
    debug!("DOCX has {} body paragraphs", paragraphs.len());

    Ok(paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

/// Inflate the main document part, refusing anything over `limit` bytes.
///
/// The declared size is checked first; the read itself is capped too, since
/// the ZIP header may lie.
fn read_document_part(bytes: &[u8], limit: u64) -> Result<String, ExtractionError> {
    let invalid = |detail: String| ExtractionError::InvalidDocx { detail };
    let too_large = || invalid(format!("{DOCUMENT_PART} expands past the {limit}-byte limit"));

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(e.to_string()))?;
    let part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))?;
    if part.size() > limit {
        warn!("Rejecting DOCX: {DOCUMENT_PART} declares {} bytes", part.size());
        return Err(too_large());
    }

    let mut raw = Vec::new();
    part.take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))?;
    if raw.len() as u64 > limit {
        return Err(too_large());
    }

    String::from_utf8(raw).map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))
}

/// Paragraph texts of a WordprocessingML body, blank ones included.
pub fn docx_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = ParagraphWalker::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => walker.open(e.local_name().as_ref(), false),
            Ok(Event::Empty(e)) => walker.open(e.local_name().as_ref(), true),
            Ok(Event::End(e)) => walker.close(e.local_name().as_ref()),
            Ok(Event::Text(t)) => {
                if walker.collecting_text() {
                    let text = t.unescape().map_err(|e| ExtractionError::InvalidDocx {
                        detail: e.to_string(),
                    })?;
                    walker.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::InvalidDocx {
                    detail: format!("XML error at byte {}: {e}", reader.buffer_position()),
                })
            }
        }
    }

    Ok(walker.paragraphs)
}

/// Tracks where the XML reader is inside the document body.
#[derive(Default)]
struct ParagraphWalker {
    paragraphs: Vec<String>,
    current: Option<String>,
    table_depth: usize,
    textbox_depth: usize,
    in_properties: bool,
    in_text: bool,
}

impl ParagraphWalker {
    fn open(&mut self, name: &[u8], empty: bool) {
        match name {
            b"tbl" if !empty => self.table_depth += 1,
            b"txbxContent" if !empty => self.textbox_depth += 1,
            b"p" if self.in_body() => {
                if empty {
                    self.paragraphs.push(String::new());
                } else {
                    self.current = Some(String::new());
                }
            }
            b"pPr" if !empty => self.in_properties = true,
            b"t" if !empty => self.in_text = true,
            b"tab" if !self.in_properties => self.push_str("\t"),
            b"br" | b"cr" => self.push_str("\n"),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"txbxContent" => self.textbox_depth = self.textbox_depth.saturating_sub(1),
            b"p" if self.in_body() => {
                if let Some(p) = self.current.take() {
                    self.paragraphs.push(p);
                }
            }
            b"pPr" => self.in_properties = false,
            b"t" => self.in_text = false,
            _ => {}
        }
    }

    fn in_body(&self) -> bool {
        self.table_depth == 0 && self.textbox_depth == 0
    }

    fn collecting_text(&self) -> bool {
        self.in_text && self.in_body() && self.current.is_some()
    }

    fn push_str(&mut self, s: &str) {
        if !self.in_body() {
            return;
        }
        if let Some(ref mut p) = self.current {
            p.push_str(s);
        }
    }
}
