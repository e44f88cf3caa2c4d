//! Ingestion pipeline.
//!
//! The [`IngestionPipeline`] turns a batch of files into one populated index
//! by composing the document loader, a [`Chunker`], an
//! [`EmbeddingProvider`], and an [`IndexLocation`]:
//!
//! 1. load every file (concurrently, results kept in input order)
//! 2. split every loaded document into chunks
//! 3. embed all chunks with a single batch call
//! 4. append all chunks to the index with a single `add` call
//!
//! Files that cannot be loaded are reported individually and skipped; the
//! rest of the batch still goes through. Embedding and storage failures abort
//! the whole batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfchat_rag::{IngestionPipeline, FixedSizeChunker, IndexLocation};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .chunker(Arc::new(FixedSizeChunker::new(1000, 200)))
//!     .index_location(IndexLocation::InMemory)
//!     .build()?;
//!
//! let (index, report) = pipeline.ingest(&[PathBuf::from("refdocs/a.txt")]).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader::load_document;
use crate::vectorstore::{IndexLocation, VectorStore};

/// A file that could not be ingested, with the reason.
#[derive(Debug)]
pub struct IngestFailure {
    /// The path as it was passed to the pipeline.
    pub path: PathBuf,
    /// Why the file was skipped. Always a per-file error
    /// ([`RagError::UnsupportedFormat`] or [`RagError::Load`]).
    pub error: RagError,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Identifiers (file names) of the documents that were indexed, in input order.
    pub processed_files: Vec<String>,
    /// Files that were skipped, in input order.
    pub failures: Vec<IngestFailure>,
    /// Number of chunks appended to the index.
    pub chunk_count: usize,
}

/// The ingestion orchestrator. Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    index_location: IndexLocation,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return the location fresh indexes are opened at.
    pub fn index_location(&self) -> &IndexLocation {
        &self.index_location
    }

    /// Ingest `paths` into a freshly opened index.
    ///
    /// Content previously persisted at the index location is replaced once
    /// the new batch commits; a failed embed or write leaves it in place.
    /// Returns `None` for the index (and an empty `processed_files`) if no
    /// file could be loaded, including when `paths` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Provider`] if embedding fails and
    /// [`RagError::Storage`] if the index cannot be opened or written.
    /// Per-file load errors are reported in [`IngestReport::failures`] instead.
    pub async fn ingest(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Option<Arc<dyn VectorStore>>, IngestReport)> {
        let (documents, mut report) = self.load_all(paths).await;
        if documents.is_empty() {
            info!(failed = report.failures.len(), "no documents loaded, index not created");
            return Ok((None, report));
        }

        let chunks = self.embed_documents(&documents).await?;
        let index = self.index_location.open_replacement().await.map_err(|e| {
            error!(error = %e, "failed to open index");
            e
        })?;
        report.chunk_count = add_to_index(index.as_ref(), &chunks).await?;
        if report.chunk_count == 0 {
            // Nothing was added, so commit the empty index over the old one.
            index.persist().await?;
        }

        info!(
            processed = report.processed_files.len(),
            failed = report.failures.len(),
            chunk_count = report.chunk_count,
            "ingestion completed"
        );
        Ok((Some(index), report))
    }

    /// Ingest `paths` into an existing index, appending to what it already holds.
    ///
    /// # Errors
    ///
    /// Same as [`ingest`](IngestionPipeline::ingest), minus opening the index.
    pub async fn ingest_into(
        &self,
        paths: &[PathBuf],
        index: &dyn VectorStore,
    ) -> Result<IngestReport> {
        let (documents, mut report) = self.load_all(paths).await;
        if !documents.is_empty() {
            let chunks = self.embed_documents(&documents).await?;
            report.chunk_count = add_to_index(index, &chunks).await?;
        }
        info!(
            processed = report.processed_files.len(),
            failed = report.failures.len(),
            chunk_count = report.chunk_count,
            "incremental ingestion completed"
        );
        Ok(report)
    }

    /// Load every path, splitting successes from per-file failures.
    async fn load_all(&self, paths: &[PathBuf]) -> (Vec<Document>, IngestReport) {
        let loaded = join_all(paths.iter().map(|path| load_document(path))).await;

        let mut documents = Vec::new();
        let mut report = IngestReport::default();
        for (path, result) in paths.iter().zip(loaded) {
            match result {
                Ok(document) => {
                    info!(document.id = %document.id, "loaded document");
                    report.processed_files.push(document.id.clone());
                    documents.push(document);
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "skipping file");
                    report.failures.push(IngestFailure { path: path.clone(), error });
                }
            }
        }
        (documents, report)
    }

    /// Chunk and embed an already loaded batch.
    async fn embed_documents(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        // 1. Chunk every document into one batch
        let mut chunks: Vec<Chunk> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        if chunks.is_empty() {
            warn!(documents = documents.len(), "loaded documents contain no text");
            return Ok(chunks);
        }

        // 2. Embed the whole batch
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            error!(expected = chunks.len(), got = embeddings.len(), "embedding count mismatch");
            return Err(RagError::Provider {
                provider: self.embedding_provider.model_id().to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        // 3. Attach embeddings to chunks
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }
        Ok(chunks)
    }
}

/// Append a whole batch to the index in one call. Returns the number added.
async fn add_to_index(index: &dyn VectorStore, chunks: &[Chunk]) -> Result<usize> {
    if chunks.is_empty() {
        return Ok(0);
    }
    index.add(chunks).await.map_err(|e| {
        error!(chunk_count = chunks.len(), error = %e, "index write failed during ingestion");
        e
    })?;
    Ok(chunks.len())
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `embedding_provider` is required. The chunker defaults to
/// [`FixedSizeChunker::default()`](crate::FixedSizeChunker) and the index
/// location to [`IndexLocation::InMemory`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    index_location: Option<IndexLocation>,
}

impl IngestionPipelineBuilder {
    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set where fresh indexes are opened.
    pub fn index_location(mut self, location: IndexLocation) -> Self {
        self.index_location = Some(location);
        self
    }

    /// Convenience for a directory-backed index location.
    pub fn index_dir(self, dir: impl AsRef<Path>) -> Self {
        self.index_location(IndexLocation::Directory(dir.as_ref().to_path_buf()))
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the embedding provider is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;

        Ok(IngestionPipeline {
            embedding_provider,
            chunker: self.chunker.unwrap_or_else(|| Arc::new(crate::FixedSizeChunker::default())),
            index_location: self.index_location.unwrap_or(IndexLocation::InMemory),
        })
    }
}
