//! Error types for the `pdfchat-rag` crate.

use thiserror::Error;

/// Errors that can occur while loading, indexing, or answering.
///
/// [`UnsupportedFormat`](RagError::UnsupportedFormat) and
/// [`Load`](RagError::Load) are per-file errors: the ingestion pipeline
/// collects them and keeps going. Every other variant aborts the operation
/// that produced it.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension is not one of the accepted document formats.
    #[error("Unsupported format for '{path}': .{extension}")]
    UnsupportedFormat {
        /// Path (or upload name) of the rejected file.
        path: String,
        /// The offending extension, lower-cased, without the dot.
        extension: String,
    },

    /// The file could not be read or its content could not be extracted.
    #[error("Failed to load '{path}': {message}")]
    Load {
        /// Path of the file that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A call to an external embedding or language model failed.
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index could not be written, read, or queried.
    #[error("Storage error ({backend}): {message}")]
    Storage {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A question was asked before any document was successfully processed.
    #[error("No documents have been processed yet; upload and process documents first")]
    EmptyIndex,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    /// Returns `true` for errors that only affect a single file during ingestion.
    pub fn is_per_file(&self) -> bool {
        matches!(self, RagError::UnsupportedFormat { .. } | RagError::Load { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
