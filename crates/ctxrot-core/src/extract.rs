//! Plain-text extraction for ingestable documents.
//!
//! TXT and Markdown are decoded as UTF-8 (lossy on invalid bytes), PDF goes
//! through `pdf-extract`. DOCX is recognised but has to be converted upstream.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Markdown,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Format from the file extension; files without a known one are read as plain text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(Self::Txt)
    }

    fn is_ingestable(self) -> bool {
        !matches!(self, Self::Docx)
    }
}

pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Txt | DocumentFormat::Markdown => Ok(match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        }),
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Extraction(e.to_string())),
        DocumentFormat::Docx => Err(Error::UnsupportedFormat("docx (convert to txt or pdf first)".into())),
    }
}

/// Read and extract a document, returning `(text, source_label)`.
///
/// The source label is the file name, which is what citations show.
pub fn read_document(path: &Path) -> Result<(String, String)> {
    let format = DocumentFormat::from_path(path);
    let bytes = fs::read(path)?;
    let text = extract_text(&bytes, format)?;
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!(path = %path.display(), chars = text.chars().count(), "extracted document");
    Ok((text, label))
}

/// All ingestable documents under `root`, sorted by path.
///
/// A file path is returned as-is regardless of its extension.
pub fn list_documents(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .and_then(DocumentFormat::from_extension)
                .is_some_and(DocumentFormat::is_ingestable)
        })
        .collect();
    files.sort();
    files
}
