//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The formats accepted for upload and ingestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format (`.pdf`).
    Pdf,
    /// Plain UTF-8 text (`.txt`).
    Text,
}

impl DocumentFormat {
    /// All accepted formats.
    pub const ALL: [DocumentFormat; 2] = [DocumentFormat::Pdf, DocumentFormat::Text];

    /// The file extension for this format, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Text => "txt",
        }
    }

    /// Resolve the format from a file extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" => Some(DocumentFormat::Text),
            _ => None,
        }
    }

    /// Resolve the format of a path from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] if the extension is missing or
    /// not one of `.pdf` / `.txt`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Self::from_extension(&extension).ok_or_else(|| RagError::UnsupportedFormat {
            path: path.display().to_string(),
            extension,
        })
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document (the source file name).
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// The format the text was extracted from.
    pub format: DocumentFormat,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata and no source URI.
    pub fn new(id: impl Into<String>, text: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            format,
            metadata: HashMap::new(),
            source_uri: None,
        }
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Return at most `max_chars` characters of the chunk text, followed by
    /// `...` when the text was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.text[..byte_idx]),
            None => self.text.clone(),
        }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_text(text: &str) -> Chunk {
        Chunk {
            id: "doc_0".into(),
            text: text.into(),
            embedding: Vec::new(),
            metadata: HashMap::new(),
            document_id: "doc".into(),
        }
    }

    #[test]
    fn format_from_path_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/B.PDF")).unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("notes.txt")).unwrap(), DocumentFormat::Text);
    }

    #[test]
    fn every_format_resolves_from_its_own_extension() {
        for format in DocumentFormat::ALL {
            assert_eq!(DocumentFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn format_from_path_rejects_unknown_and_missing_extensions() {
        let err = DocumentFormat::from_path(Path::new("report.docx")).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { ref extension, .. } if extension == "docx"));

        let err = DocumentFormat::from_path(Path::new("README")).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { ref extension, .. } if extension.is_empty()));
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let chunk = chunk_with_text("héllo wörld");
        assert_eq!(chunk.preview(5), "héllo...");
        assert_eq!(chunk.preview(11), "héllo wörld");
        assert_eq!(chunk.preview(500), "héllo wörld");
    }
}
