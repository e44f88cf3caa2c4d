//! Loading raw documents from disk.
//!
//! Text files are read as UTF-8. PDF text is extracted with `pdf-extract`
//! on the blocking thread pool.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::document::{Document, DocumentFormat};
use crate::error::{RagError, Result};

/// Load a document, choosing the extractor from the file extension.
///
/// The document ID is the file name; metadata records the source path, the
/// format, and the file size in bytes.
///
/// # Errors
///
/// - [`RagError::UnsupportedFormat`] if the extension is not `.pdf` or `.txt`
/// - [`RagError::Load`] if the file cannot be read or its text cannot be extracted
pub async fn load_document(path: &Path) -> Result<Document> {
    let format = DocumentFormat::from_path(path)?;
    let load_err = |message: String| RagError::Load { path: path.display().to_string(), message };

    let bytes = tokio::fs::read(path).await.map_err(|e| load_err(e.to_string()))?;
    let size = bytes.len();

    let text = match format {
        DocumentFormat::Text => {
            String::from_utf8(bytes).map_err(|e| load_err(format!("not valid UTF-8: {e}")))?
        }
        DocumentFormat::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| load_err(format!("extraction task failed: {e}")))?
        .map_err(|e| load_err(format!("failed to extract PDF text: {e}")))?,
    };

    let id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let metadata = HashMap::from([
        ("source".to_string(), path.display().to_string()),
        ("format".to_string(), format.to_string()),
        ("size_bytes".to_string(), size.to_string()),
    ]);

    debug!(document.id = %id, %format, size, text_len = text.len(), "loaded document");

    Ok(Document {
        id,
        text,
        format,
        metadata,
        source_uri: Some(path.display().to_string()),
    })
}
