//! Raw document text extraction for the knowledge build.
//!
//! The source regulation usually arrives as a PDF. PDFs are decoded with
//! `pdf-extract`; anything else must be UTF-8 text. The result is the raw
//! text handed to the chunker.

use std::path::Path;

use thiserror::Error;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Document format detected from extension and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("document is not valid UTF-8 text: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Classify a document by magic bytes, falling back to the extension.
pub fn detect_kind(path: &Path, bytes: &[u8]) -> DocumentKind {
    if bytes.starts_with(PDF_MAGIC) {
        return DocumentKind::Pdf;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
        _ => DocumentKind::Text,
    }
}

/// Extract plain text from document bytes.
pub fn extract_text(bytes: Vec<u8>, kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        DocumentKind::Text => Ok(String::from_utf8(bytes)?),
    }
}

/// Read `path` and return its text, trimmed of surrounding whitespace.
pub fn read_document(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let kind = detect_kind(path, &bytes);
    tracing::debug!(path = %path.display(), ?kind, bytes = bytes.len(), "reading document");

    let text = extract_text(bytes, kind)?;
    Ok(text.trim().to_string())
}
