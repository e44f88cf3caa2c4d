//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `Vec` protected by a `tokio::sync::RwLock`. It is suitable for tests,
//! one-shot runs, and small document pools that need no durability.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;
use crate::vectorstore::{VectorStore, check_dimensions, rank};

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// [`persist`](VectorStore::persist) and [`reload`](VectorStore::reload) are
/// no-ops: the contents live exactly as long as the value.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(&chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let mut stored = self.chunks.write().await;
        let expected = stored.first().map(|c| c.embedding.len());
        check_dimensions(BACKEND, expected, chunks)?;
        stored.extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let stored = self.chunks.read().await;
        Ok(rank(&stored, embedding, top_k))
    }

    async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }

    async fn chunks(&self) -> Vec<Chunk> {
        self.chunks.read().await.clone()
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        Ok(())
    }
}
