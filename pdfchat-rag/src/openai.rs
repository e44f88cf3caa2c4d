//! OpenAI-compatible embedding and chat providers.
//!
//! Both providers talk to the REST API directly with `reqwest` and work with
//! any server exposing the OpenAI `/embeddings` and `/chat/completions`
//! endpoints (OpenAI, Azure-style gateways, vLLM, Ollama, LiteLLM, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::{GenerationParams, LanguageModel};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default model for answers.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Maximum number of inputs sent in one embeddings request.
const DEFAULT_BATCH_SIZE: usize = 256;

/// Connection settings for an OpenAI-compatible endpoint.
///
/// Credentials are passed in explicitly; nothing is read from the environment
/// at call time.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenAIConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
}

impl OpenAIConfig {
    /// Create a config for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: OPENAI_API_BASE.to_string(), model: model.into() }
    }

    /// Point the config at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn validate(&self, provider: &str) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RagError::Config(format!("{provider}: API key must not be empty")));
        }
        if self.model.is_empty() {
            return Err(RagError::Config(format!("{provider}: model must not be empty")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Known output sizes of OpenAI embedding models.
fn default_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn provider_err(provider: &str, message: String) -> RagError {
    RagError::Provider { provider: provider.to_string(), message }
}

/// POST `body` to `url` and decode a JSON response, mapping every failure to
/// [`RagError::Provider`].
async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
    client: &reqwest::Client,
    provider: &str,
    config: &OpenAIConfig,
    url: &str,
    body: &B,
) -> Result<R> {
    let response =
        client.post(url).bearer_auth(&config.api_key).json(body).send().await.map_err(|e| {
            error!(provider, error = %e, "request failed");
            provider_err(provider, format!("request failed: {e}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);

        error!(provider, %status, "API error");
        return Err(provider_err(provider, format!("API returned {status}: {detail}")));
    }

    response.json().await.map_err(|e| {
        error!(provider, error = %e, "failed to parse response");
        provider_err(provider, format!("failed to parse response: {e}"))
    })
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Large batches are split into requests of at most `batch_size` inputs;
/// the returned vectors keep input order.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::new("sk-...", "text-embedding-3-small"))?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
    batch_size: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider from explicit connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key or model is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate("OpenAI embeddings")?;
        Ok(Self {
            client: reqwest::Client::new(),
            dimensions: default_dimensions(&config.model),
            config,
            request_dimensions: None,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Set the maximum number of inputs per request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn embed_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
            dimensions: self.request_dimensions,
        };
        let response: EmbeddingResponse = post_json(
            &self.client,
            "OpenAI",
            &self.config,
            &self.config.endpoint("embeddings"),
            &request_body,
        )
        .await?;

        if response.data.len() != texts.len() {
            return Err(provider_err(
                "OpenAI",
                format!("expected {} embeddings, API returned {}", texts.len(), response.data.len()),
            ));
        }

        let mut data = response.data;
        if data.iter().any(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
            let contiguous = data.iter().enumerate().all(|(i, d)| d.index == Some(i));
            if !contiguous {
                let indices: Vec<Option<usize>> = data.iter().map(|d| d.index).collect();
                return Err(provider_err(
                    "OpenAI",
                    format!("embedding indices {indices:?} do not cover 0..{}", texts.len()),
                ));
            }
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "OpenAI", text_len = text.len(), "embedding single text");

        let results = self.embed_request(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| provider_err("OpenAI", "API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "OpenAI",
            batch_size = texts.len(),
            model = %self.config.model,
            "embedding batch"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

/// A [`LanguageModel`] backed by an OpenAI-compatible chat completions API.
///
/// The prompt is sent as a single user message with `stream: false`.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIChatModel {
    /// Create a chat model from explicit connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the API key or model is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate("OpenAI chat")?;
        Ok(Self { client: reqwest::Client::new(), config })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        debug!(
            provider = "OpenAI",
            model = %self.config.model,
            prompt_len = prompt.len(),
            max_tokens = params.max_tokens,
            "generating completion"
        );

        let request_body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stream: false,
        };
        let response: ChatResponse = post_json(
            &self.client,
            "OpenAI",
            &self.config,
            &self.config.endpoint("chat/completions"),
            &request_body,
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| provider_err("OpenAI", "API returned no completion".into()))
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
