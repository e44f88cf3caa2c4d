//! The embedding seam shared by ingestion and question answering.

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-length vectors.
///
/// One instance embeds both the indexed chunks and the questions asked
/// against them. Nothing checks that an index was built with the same
/// [`model_id`](EmbeddingProvider::model_id) it is queried with; the vector
/// store only rejects mismatched dimensions.
///
/// Errors are [`RagError::Provider`](crate::RagError::Provider) and are not
/// retried.
///
/// ```rust,ignore
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert_eq!(vectors[0].len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts, returning one vector per input in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Model name, for logs and error messages.
    fn model_id(&self) -> &str;
}
