//! Retrieval-augmented answering.
//!
//! [`AnswerEngine`] answers a question against a populated index:
//! embed the question → search top-k → join the hits into a context block →
//! render the prompt → one non-streaming model call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;
use crate::prompt::PromptTemplate;
use crate::vectorstore::VectorStore;

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// The answer to one question, with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// The question as asked.
    pub query: String,
    /// The generated answer.
    pub result: String,
    /// Retrieved chunks in similarity-rank order.
    pub source_documents: Vec<Chunk>,
}

/// Answers questions from an index using a language model.
///
/// The embedding provider must be the one the index was built with.
pub struct AnswerEngine {
    config: RagConfig,
    template: PromptTemplate,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
}

impl AnswerEngine {
    /// Create an engine using the default prompt template.
    pub fn new(
        config: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let template = PromptTemplate::with_min_words(config.min_answer_words);
        Self { config, template, embedding_provider, index, llm }
    }

    /// Replace the prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Return a reference to the index this engine reads from.
    pub fn index(&self) -> &Arc<dyn VectorStore> {
        &self.index
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer a question.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if the question is blank
    /// - [`RagError::EmptyIndex`] if the index holds no chunks
    /// - [`RagError::Provider`] if embedding or generation fails
    /// - [`RagError::Storage`] if the search fails
    pub async fn answer(&self, question: &str) -> Result<AnswerResult> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }
        if self.index.is_empty().await {
            return Err(RagError::EmptyIndex);
        }

        // 1. Embed the question
        let query_embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        // 2. Retrieve the top-k chunks
        let results = self.index.search(&query_embedding, self.config.top_k).await.map_err(|e| {
            error!(error = %e, "index search failed");
            e
        })?;
        let source_documents: Vec<Chunk> = results
            .into_iter()
            .filter(|r| self.config.similarity_threshold.is_none_or(|t| r.score >= t))
            .map(|r| {
                debug!(chunk.id = %r.chunk.id, score = r.score, "retrieved chunk");
                r.chunk
            })
            .collect();

        // 3. Assemble the prompt
        let context = source_documents
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let prompt = self.template.render(&context, question);

        // 4. Generate
        let result = self.llm.generate(&prompt, &self.config.generation).await.map_err(|e| {
            error!(model = self.llm.name(), error = %e, "generation failed");
            e
        })?;

        info!(
            model = self.llm.name(),
            source_count = source_documents.len(),
            answer_len = result.len(),
            "question answered"
        );

        Ok(AnswerResult { query: question.to_string(), result, source_documents })
    }
}
