//! Vector store trait for storing and searching vector embeddings.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::filestore::FileVectorStore;
use crate::inmemory::InMemoryVectorStore;

/// A storage backend for vector embeddings with similarity search.
///
/// A store holds a single append-only index. Every call to
/// [`add`](VectorStore::add) grows it; adding the same chunk twice stores it
/// twice. Implementations serialise writes relative to reads so a search
/// never observes half of a batch.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(&chunks).await?;
/// let results = store.search(&query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append chunks to the index. Chunks must have embeddings set.
    async fn add(&self, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns at most `top_k` results ordered by descending similarity score.
    /// Equal scores keep insertion order.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of chunks in the index.
    async fn len(&self) -> usize;

    /// Whether the index holds no chunks.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every chunk in the index, in insertion order.
    async fn chunks(&self) -> Vec<Chunk>;

    /// Flush the current contents to durable storage.
    async fn persist(&self) -> Result<()>;

    /// Replace the in-memory contents with the last persisted state.
    async fn reload(&self) -> Result<()>;
}

/// Where an index lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
    /// Process memory only; nothing survives a restart.
    InMemory,
    /// A directory holding a persisted snapshot. Reopening the same directory
    /// without `fresh` resumes whatever a previous run left there.
    Directory(PathBuf),
}

impl IndexLocation {
    /// Open the index at this location.
    ///
    /// With `fresh`, any previously persisted contents are discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if a directory index cannot be created,
    /// cleared, or read.
    pub async fn open(&self, fresh: bool) -> Result<Arc<dyn VectorStore>> {
        match self {
            IndexLocation::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),
            IndexLocation::Directory(dir) => Ok(Arc::new(FileVectorStore::open(dir, fresh).await?)),
        }
    }

    /// Open an empty index that replaces what is persisted here on its first
    /// successful commit. A failed commit leaves the previous snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if a directory index cannot be created.
    pub async fn open_replacement(&self) -> Result<Arc<dyn VectorStore>> {
        match self {
            IndexLocation::InMemory => Ok(Arc::new(InMemoryVectorStore::new())),
            IndexLocation::Directory(dir) => Ok(Arc::new(FileVectorStore::replacing(dir).await?)),
        }
    }

    /// Remove anything persisted at this location.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if the snapshot exists but cannot be removed.
    pub async fn clear(&self) -> Result<()> {
        match self {
            IndexLocation::InMemory => Ok(()),
            IndexLocation::Directory(dir) => FileVectorStore::clear(dir).await,
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every chunk against `embedding` and keep the best `top_k`.
///
/// The sort is stable, so ties keep the order of `chunks`.
pub(crate) fn rank(chunks: &[Chunk], embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = chunks
        .iter()
        .map(|chunk| SearchResult {
            chunk: chunk.clone(),
            score: cosine_similarity(&chunk.embedding, embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}

/// Check that every chunk carries an embedding of the same dimension as the
/// index (`expected`, when the index is non-empty) and as each other.
///
/// Returns the batch dimension, or `None` for an empty batch.
pub(crate) fn check_dimensions(
    backend: &str,
    expected: Option<usize>,
    chunks: &[Chunk],
) -> Result<Option<usize>> {
    let mut dimension = expected;
    for chunk in chunks {
        let len = chunk.embedding.len();
        if len == 0 {
            return Err(RagError::Storage {
                backend: backend.to_string(),
                message: format!("chunk '{}' has no embedding", chunk.id),
            });
        }
        match dimension {
            Some(d) if d != len => {
                return Err(RagError::Storage {
                    backend: backend.to_string(),
                    message: format!(
                        "chunk '{}' has embedding dimension {len}, index expects {d}",
                        chunk.id
                    ),
                });
            }
            Some(_) => {}
            None => dimension = Some(len),
        }
    }
    Ok(dimension)
}
