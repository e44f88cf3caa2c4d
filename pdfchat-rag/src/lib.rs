//! # pdfchat-rag
//!
//! Question answering over uploaded PDF and text documents.
//!
//! Documents are split into overlapping fixed-size chunks, embedded, and
//! stored in a vector index. A question is embedded with the same provider,
//! the closest chunks are retrieved, and a language model answers from them.
//!
//! ## Overview
//!
//! - [`Session`]: upload → process → ask state machine over a staging directory
//! - [`IngestionPipeline`]: load → chunk → embed → index for a batch of files
//! - [`AnswerEngine`]: retrieve top-k → prompt → generate
//! - [`VectorStore`]: [`InMemoryVectorStore`] and the persistent [`FileVectorStore`]
//! - [`EmbeddingProvider`] / [`LanguageModel`]: provider seams, with
//!   OpenAI-compatible ([`openai`]) and offline ([`mock`]) implementations
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pdfchat_rag::{MockEmbeddingProvider, MockLlm, Session, SessionConfig};
//!
//! let mut session = Session::open(
//!     SessionConfig::default(),
//!     Arc::new(MockEmbeddingProvider::default()),
//!     Arc::new(MockLlm::new("...")),
//! )
//! .await?;
//!
//! session.upload("a.txt", b"Alpha Beta. Gamma Delta.").await?;
//! session.process().await?;
//! let answer = session.ask("What is Alpha?").await?;
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod mock;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod vectorstore;

pub use answer::{AnswerEngine, AnswerResult};
pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, DocumentFormat, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filestore::FileVectorStore;
pub use inmemory::InMemoryVectorStore;
pub use llm::{GenerationParams, LanguageModel};
pub use loader::load_document;
pub use mock::{MockEmbeddingProvider, MockLlm};
pub use openai::{OpenAIChatModel, OpenAIConfig, OpenAIEmbeddingProvider};
pub use pipeline::{IngestFailure, IngestReport, IngestionPipeline, IngestionPipelineBuilder};
pub use prompt::PromptTemplate;
pub use session::{Session, SessionConfig, SessionStatus, StagedFile, UploadOutcome};
pub use vectorstore::{IndexLocation, VectorStore};
