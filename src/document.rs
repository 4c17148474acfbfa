use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;

use crate::error::{RagError, Result};

/// A document handed to the indexing pipeline: a name (used as the source
/// identifier of every chunk it yields) and its extracted plain text.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Document {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Read a document from disk, extracting its text by MIME type.
    ///
    /// Extraction failures are not errors: an unreadable PDF, an unsupported
    /// format, or an I/O problem logs a warning and yields empty text, which
    /// the pipeline then records as a skipped document. Only a path without
    /// a usable file name is rejected.
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RagError::InvalidArgument(format!("invalid file name: {}", path.display()))
            })?
            .to_string();

        let mime = from_path(path).first_or_octet_stream();
        debug!("Detected MIME type {} for {}", mime, path.display());

        let text = extract_content(path, mime.as_ref());
        Ok(Document { name, text })
    }
}

/// Extract a document's text, degrading to empty text on any failure.
fn extract_content(path: &Path, mime_type: &str) -> String {
    match mime_type {
        mime if mime.starts_with("application/pdf") => {
            info!("Extracting PDF document: {}", path.display());
            match extract_text(path) {
                // PDF extraction output tends to carry noisy whitespace.
                Ok(content) => normalize_whitespace(&content),
                Err(e) => {
                    warn!("Failed to extract text from {}: {}", path.display(), e);
                    String::new()
                }
            }
        }

        mime if mime.starts_with("text/") => {
            info!("Reading text document: {}", path.display());
            match fs::read_to_string(path) {
                Ok(content) => normalize_whitespace(&content),
                Err(e) => {
                    warn!("Failed to read {}: {}", path.display(), e);
                    String::new()
                }
            }
        }

        other => {
            warn!(
                "Unsupported document format {} for {}; only text and PDF are supported",
                other,
                path.display()
            );
            String::new()
        }
    }
}

/// Normalize whitespace: drop `\r`, collapse space runs, and reduce runs of
/// blank lines to a single paragraph break.
fn normalize_whitespace(text: &str) -> String {
    let result = text.replace('\r', "");

    let mut prev_char = ' ';
    let mut newline_count = 0;
    let mut normalized = String::with_capacity(result.len());

    for c in result.chars() {
        if c == '\n' {
            newline_count += 1;
        } else {
            if newline_count > 0 {
                if newline_count >= 2 {
                    normalized.push_str("\n\n");
                } else {
                    normalized.push('\n');
                }
                newline_count = 0;
            }

            if !(c == ' ' && prev_char == ' ') {
                normalized.push(c);
            }

            prev_char = c;
        }
    }

    if newline_count > 0 {
        if newline_count >= 2 {
            normalized.push_str("\n\n");
        } else {
            normalized.push('\n');
        }
    }

    normalized.trim().to_string()
}
