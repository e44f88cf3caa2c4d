//! `pdfchat`: chat with your PDF and text files from the terminal.
//!
//! Reads `.env` on startup. Provider credentials come from `OPENAI_API_KEY`
//! (or `--api-key`); `--provider mock` runs fully offline.
//!
//! ```text
//! pdfchat                                   # interactive session
//! pdfchat --fresh                           # discard the previous run's files and index
//! pdfchat ask -f a.txt -f b.pdf "What is Alpha?"
//! ```

mod cli;
mod repl;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pdfchat_rag::{AnswerEngine, FixedSizeChunker, IngestionPipeline, Session};
use serde_json::json;
use tracing::warn;

use crate::cli::{Cli, Command, Options};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init(cli.options.log_format);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&cli.options).await,
        Command::Ask { files, question, json } => ask_once(&cli.options, &files, &question, json).await,
    }
}

async fn chat(options: &Options) -> Result<()> {
    let providers = options.providers()?;
    let session = Session::open(options.session_config()?, providers.embedder, providers.llm)
        .await
        .context("failed to open session")?;
    repl::run(session).await
}

/// Index `files` in memory, answer `question`, and print the result.
async fn ask_once(options: &Options, files: &[PathBuf], question: &str, as_json: bool) -> Result<()> {
    let rag = options.rag_config()?;
    let providers = options.providers()?;

    let pipeline = IngestionPipeline::builder()
        .embedding_provider(Arc::clone(&providers.embedder))
        .chunker(Arc::new(FixedSizeChunker::from_config(&rag)))
        .build()?;
    let (index, report) = pipeline.ingest(files).await?;
    for failure in &report.failures {
        warn!(path = %failure.path.display(), error = %failure.error, "file skipped");
    }
    let index = index.context("none of the given files could be loaded")?;

    let engine = AnswerEngine::new(rag, providers.embedder, index, providers.llm);
    let answer = engine.answer(question).await?;

    if as_json {
        let sources: Vec<_> = answer
            .source_documents
            .iter()
            .map(|chunk| json!({ "document_id": chunk.document_id, "chunk_id": chunk.id, "text": chunk.text }))
            .collect();
        let output = json!({ "query": answer.query, "result": answer.result, "source_documents": sources });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", repl::render_answer(&answer));
    }
    Ok(())
}
