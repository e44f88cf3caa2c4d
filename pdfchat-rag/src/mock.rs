//! Offline providers for tests, demos, and running without API keys.
//!
//! - [`MockEmbeddingProvider`]: deterministic bag-of-words hashing, so texts
//!   sharing words land close together
//! - [`MockLlm`]: returns a canned answer and records every prompt it saw

use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::{GenerationParams, LanguageModel};

/// Deterministic embedding provider based on hashed word counts.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fail_with: Option<String>,
}

impl MockEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1), fail_with: None }
    }

    /// Make every call fail with a [`RagError::Provider`] carrying `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    fn bucket(&self, word: &str) -> usize {
        let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(message) = &self.fail_with {
            return Err(RagError::Provider { provider: "mock".into(), message: message.clone() });
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            embedding[self.bucket(&word.to_lowercase())] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "mock-bag-of-words"
    }
}

/// A language model that answers with fixed text.
#[derive(Debug, Default)]
pub struct MockLlm {
    response: Option<String>,
    fail_with: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Answer every prompt with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: Some(response.into()), ..Self::default() }
    }

    /// Make every call fail with a [`RagError::Provider`] carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { fail_with: Some(message.into()), ..Self::default() }
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).push(prompt.to_string());

        if let Some(message) = &self.fail_with {
            return Err(RagError::Provider { provider: "mock".into(), message: message.clone() });
        }
        // Without a canned response, echo the tail of the prompt so offline
        // runs still show something tied to the question.
        Ok(self.response.clone().unwrap_or_else(|| {
            let question = prompt.rsplit("Question:").next().unwrap_or(prompt);
            format!("[mock answer] {}", question.trim().trim_end_matches("Assistant:").trim())
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
