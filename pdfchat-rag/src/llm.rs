//! Language model trait used to generate answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { max_tokens: 512, temperature: 0.1, top_p: 0.9 }
    }
}

impl GenerationParams {
    /// Check that the parameters are within the ranges providers accept.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `max_tokens` is zero, `temperature` is
    /// outside `0.0..=2.0`, or `top_p` is outside `0.0..=1.0`.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::Config("max_tokens must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::Config(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(RagError::Config(format!(
                "top_p ({}) must be between 0.0 and 1.0",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// A text generation backend.
///
/// One call produces one complete, non-streamed completion for a fully
/// assembled prompt. Failures are reported as
/// [`RagError::Provider`](crate::RagError::Provider).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Name of the underlying model.
    fn name(&self) -> &str;
}
