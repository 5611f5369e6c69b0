//! Input handling: turn an upload or a local path into an [`UploadedDocument`].
//!
//! The declared format comes from the file extension, as in the upload form
//! (`.pdf` / `.docx`). The leading bytes are checked against that format so
//! a renamed file fails with a clear message instead of a parser error.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Format implied by a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    fn magic(&self) -> &'static [u8] {
        match self {
            DocumentFormat::Pdf => PDF_MAGIC,
            DocumentFormat::Docx => ZIP_MAGIC,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw bytes of one uploaded file plus its declared format.
///
/// Owned by the review for the duration of one request and dropped right
/// after text extraction.
#[derive(Clone)]
pub struct UploadedDocument {
    pub name: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl UploadedDocument {
    /// Build a document from an upload, deriving the format from `name`.
    pub fn from_upload(
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self, ExtractionError> {
        let name = name.into();
        let format = DocumentFormat::from_file_name(&name)
            .ok_or_else(|| ExtractionError::UnsupportedFormat { name: name.clone() })?;
        let document = Self {
            name,
            format,
            bytes: bytes.into(),
        };
        document.validate_magic()?;
        debug!(
            "Accepted upload '{}' ({}, {} bytes)",
            document.name,
            document.format,
            document.bytes.len()
        );
        Ok(document)
    }

    /// Read a local file, deriving the format from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // Reject by extension before touching the disk.
        if DocumentFormat::from_file_name(&name).is_none() {
            return Err(ExtractionError::UnsupportedFormat { name });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_upload(name, bytes)
    }

    fn validate_magic(&self) -> Result<(), ExtractionError> {
        let magic = self.format.magic();
        if !self.bytes.starts_with(magic) {
            return Err(ExtractionError::FormatMismatch {
                name: self.name.clone(),
                expected: self.format.label(),
                magic: self.bytes.iter().take(magic.len()).copied().collect(),
            });
        }
        Ok(())
    }
}
