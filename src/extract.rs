//! Text extraction for uploaded documents.
//!
//! Callers supply raw bytes plus a file name and optional declared MIME
//! type; this module resolves the content type and returns plain UTF-8 text.

use std::path::Path;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_PDF: &str = "application/pdf";

/// Extraction error. Extraction never panics on malformed input.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    Empty,
    TooLarge { size: usize, limit: usize },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Empty => write!(f, "document contains no text"),
            ExtractError::TooLarge { size, limit } => {
                write!(f, "document is {} bytes, limit is {} bytes", size, limit)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Resolves the content type of an upload.
///
/// A recognised declared type wins; otherwise the file extension decides.
/// Browsers often send `application/octet-stream` or nothing at all for
/// local files, which is why the extension fallback exists.
pub fn content_type_for(name: &str, declared: Option<&str>) -> Option<&'static str> {
    if let Some(declared) = declared {
        let essence = declared.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            MIME_TEXT => return Some(MIME_TEXT),
            MIME_MARKDOWN => return Some(MIME_MARKDOWN),
            MIME_PDF => return Some(MIME_PDF),
            _ => {}
        }
    }

    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") => Some(MIME_TEXT),
        Some("md") | Some("markdown") => Some(MIME_MARKDOWN),
        Some("pdf") => Some(MIME_PDF),
        _ => None,
    }
}

/// Extracts text from `bytes` of the given content type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    let text = match content_type {
        MIME_TEXT | MIME_MARKDOWN => String::from_utf8_lossy(bytes).into_owned(),
        MIME_PDF => extract_pdf(bytes)?,
        _ => {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ))
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(text)
}

/// Enforces the size limit, resolves the type, and extracts.
///
/// Returns the resolved content type alongside the text.
pub fn extract_upload(
    name: &str,
    declared: Option<&str>,
    bytes: &[u8],
    limit: usize,
) -> Result<(&'static str, String), ExtractError> {
    if bytes.len() > limit {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            limit,
        });
    }
    let content_type = content_type_for(name, declared).ok_or_else(|| {
        ExtractError::UnsupportedContentType(declared.unwrap_or("unknown").to_string())
    })?;
    let text = extract_text(bytes, content_type)?;
    Ok((content_type, text))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join("\n"))
}
