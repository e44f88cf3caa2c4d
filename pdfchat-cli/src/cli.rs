//! Command-line arguments and the wiring from them to library types.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdfchat_rag::openai::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OPENAI_API_BASE};
use pdfchat_rag::{
    EmbeddingProvider, IndexLocation, LanguageModel, MockEmbeddingProvider, MockLlm,
    OpenAIChatModel, OpenAIConfig, OpenAIEmbeddingProvider, RagConfig, SessionConfig,
};

#[derive(Debug, Parser)]
#[command(name = "pdfchat")]
#[command(about = "Ask questions about your PDF and text documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub options: Options,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive session: upload, process, and ask (the default)
    Chat,

    /// Index the given files in memory and answer a single question
    Ask {
        /// Document to include (repeatable, .pdf or .txt)
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// The question to answer
        question: String,

        /// Print the answer and its sources as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Which backend answers embedding and generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Any OpenAI-compatible HTTP API
    #[value(name = "openai")]
    OpenAi,
    /// Offline hashing embedder and echoing model, no network
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct Options {
    /// Directory uploaded documents are staged in
    #[arg(long, env = "PDFCHAT_STAGING_DIR", default_value = "./refdocs", global = true)]
    pub staging_dir: PathBuf,

    /// Directory the vector index is persisted in
    #[arg(long, env = "PDFCHAT_INDEX_DIR", default_value = "./index_db", global = true)]
    pub index_dir: PathBuf,

    /// Keep the index in memory instead of persisting it
    #[arg(long, global = true)]
    pub in_memory: bool,

    /// Discard staged files and the persisted index left by a previous run
    #[arg(long, global = true)]
    pub fresh: bool,

    /// JSON file with chunking, retrieval, and generation settings
    #[arg(long, env = "PDFCHAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Embedding and language model backend
    #[arg(long, value_enum, env = "PDFCHAT_PROVIDER", default_value_t = ProviderKind::OpenAi, global = true)]
    pub provider: ProviderKind,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_API_BASE, global = true)]
    pub base_url: String,

    /// Embedding model name
    #[arg(long, env = "PDFCHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    pub embedding_model: String,

    /// Request embeddings truncated to this many dimensions
    #[arg(long, env = "PDFCHAT_EMBEDDING_DIMENSIONS", global = true)]
    pub embedding_dimensions: Option<usize>,

    /// Chat model name
    #[arg(long, env = "PDFCHAT_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL, global = true)]
    pub chat_model: String,

    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, env = "PDFCHAT_LOG_FORMAT", default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

/// The embedder and model shared by ingestion and answering.
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LanguageModel>,
}

impl Options {
    /// Load `--config` if given, otherwise the defaults.
    pub fn rag_config(&self) -> Result<RagConfig> {
        match &self.config {
            Some(path) => load_rag_config(path),
            None => Ok(RagConfig::default()),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let index_location = if self.in_memory {
            IndexLocation::InMemory
        } else {
            IndexLocation::Directory(self.index_dir.clone())
        };
        Ok(SessionConfig {
            staging_dir: self.staging_dir.clone(),
            index_location,
            fresh: self.fresh,
            rag: self.rag_config()?,
        })
    }

    pub fn providers(&self) -> Result<Providers> {
        match self.provider {
            ProviderKind::Mock => Ok(Providers {
                embedder: Arc::new(MockEmbeddingProvider::default()),
                llm: Arc::new(MockLlm::default()),
            }),
            ProviderKind::OpenAi => {
                let api_key = self
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
                    .context("OPENAI_API_KEY is not set; pass --api-key or use --provider mock")?;

                let mut embedder = OpenAIEmbeddingProvider::new(
                    OpenAIConfig::new(api_key.clone(), &self.embedding_model)
                        .with_base_url(&self.base_url),
                )?;
                if let Some(dimensions) = self.embedding_dimensions {
                    embedder = embedder.with_dimensions(dimensions);
                }
                let llm = OpenAIChatModel::new(
                    OpenAIConfig::new(api_key, &self.chat_model).with_base_url(&self.base_url),
                )?;

                Ok(Providers { embedder: Arc::new(embedder), llm: Arc::new(llm) })
            }
        }
    }
}

fn load_rag_config(path: &Path) -> Result<RagConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let config: RagConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    config.validate()?;
    Ok(config)
}
