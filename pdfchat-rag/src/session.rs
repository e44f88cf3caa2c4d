//! Upload → process → ask session.
//!
//! A [`Session`] is the single piece of mutable state behind the
//! question-answering surface. It moves through three states:
//!
//! ```text
//!            upload            process              reset
//!   Empty ───────────▶ Staged ─────────▶ Ready ───────────▶ Empty
//!                        ▲                 │
//!                        └──── upload ─────┘
//! ```
//!
//! - `upload` writes a file into the staging directory. The same name and
//!   size twice is a duplicate and is ignored with a warning.
//! - `process` rebuilds one combined index from every staged file and
//!   replaces the answer engine.
//! - `ask` is only accepted in `Ready`.
//! - `reset` deletes staged files and the persisted index and drops all handles.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::answer::{AnswerEngine, AnswerResult};
use crate::chunking::FixedSizeChunker;
use crate::config::RagConfig;
use crate::document::DocumentFormat;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;
use crate::pipeline::{IngestReport, IngestionPipeline};
use crate::vectorstore::{IndexLocation, VectorStore};

const STAGING_BACKEND: &str = "staging";

/// Where a session keeps its files and how it treats leftovers.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory uploaded files are written to.
    pub staging_dir: PathBuf,
    /// Where the index is persisted.
    pub index_location: IndexLocation,
    /// Start from nothing: delete staged files and the persisted index on open.
    /// Without it, a previous run's staged files and index are picked up again.
    pub fresh: bool,
    /// Chunking, retrieval, and generation settings.
    pub rag: RagConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("./refdocs"),
            index_location: IndexLocation::Directory(PathBuf::from("./index_db")),
            fresh: false,
            rag: RagConfig::default(),
        }
    }
}

/// The externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Nothing uploaded.
    Empty,
    /// Files uploaded but not yet processed into an index.
    Staged,
    /// An index and answer engine are available.
    Ready,
}

/// A file sitting in the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// File name, used as the document identifier.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Location inside the staging directory.
    pub path: PathBuf,
}

impl StagedFile {
    /// De-duplication key: `{name}_{size}`.
    pub fn file_id(&self) -> String {
        format!("{}_{}", self.name, self.size)
    }
}

/// Result of [`Session::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file was written to the staging directory.
    Staged(StagedFile),
    /// A file with the same name and size is already staged; nothing changed.
    Duplicate {
        /// The identifier that collided.
        file_id: String,
    },
}

/// A single-user question-answering session.
///
/// Held by the caller and mutated only through its methods; there is no
/// process-wide state.
pub struct Session {
    config: SessionConfig,
    pipeline: IngestionPipeline,
    llm: Arc<dyn LanguageModel>,
    staged: Vec<StagedFile>,
    processed_files: Vec<String>,
    engine: Option<AnswerEngine>,
}

impl Session {
    /// Open a session.
    ///
    /// With `config.fresh`, staged files and the persisted index are deleted
    /// first. Otherwise accepted files already in the staging directory are
    /// adopted as staged, and a non-empty persisted index is resumed, putting
    /// the session straight into [`SessionStatus::Ready`].
    ///
    /// # Errors
    ///
    /// - [`RagError::Config`] if `config.rag` is invalid
    /// - [`RagError::Storage`] if the staging directory or index cannot be
    ///   created, read, or cleared
    pub async fn open(
        config: SessionConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        config.rag.validate()?;
        tokio::fs::create_dir_all(&config.staging_dir).await.map_err(|e| {
            staging_err(format!("failed to create '{}': {e}", config.staging_dir.display()))
        })?;

        let pipeline = IngestionPipeline::builder()
            .embedding_provider(embedding_provider)
            .chunker(Arc::new(FixedSizeChunker::from_config(&config.rag)))
            .index_location(config.index_location.clone())
            .build()?;

        let mut session = Self {
            config,
            pipeline,
            llm,
            staged: Vec::new(),
            processed_files: Vec::new(),
            engine: None,
        };

        if session.config.fresh {
            session.clear_staging_dir().await?;
            session.config.index_location.clear().await?;
        } else {
            session.adopt_staged_files().await?;
            session.resume_index().await?;
        }

        info!(
            staging_dir = %session.config.staging_dir.display(),
            fresh = session.config.fresh,
            status = ?session.status(),
            staged = session.staged.len(),
            "session opened"
        );
        Ok(session)
    }

    /// Current state.
    pub fn status(&self) -> SessionStatus {
        if self.engine.is_some() {
            SessionStatus::Ready
        } else if !self.staged.is_empty() {
            SessionStatus::Staged
        } else {
            SessionStatus::Empty
        }
    }

    /// Files currently staged, in upload order.
    pub fn staged_files(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Identifiers of the documents in the current index.
    pub fn processed_files(&self) -> &[String] {
        &self.processed_files
    }

    /// The current index, if the session is ready.
    pub fn index(&self) -> Option<&Arc<dyn VectorStore>> {
        self.engine.as_ref().map(AnswerEngine::index)
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stage an uploaded file.
    ///
    /// Only the final path component of `name` is used. A file with the same
    /// name but a different size replaces the staged one. Uploading while
    /// `Ready` drops the current answer engine and the persisted index; call
    /// [`process`](Session::process) again to answer questions.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `name` has no file name component
    /// - [`RagError::UnsupportedFormat`] if the file is not `.pdf` or `.txt`
    /// - [`RagError::Storage`] if the file cannot be written or the old index
    ///   cannot be removed
    pub async fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RagError::InvalidInput(format!("'{name}' is not a file name")))?;
        DocumentFormat::from_path(Path::new(&name))?;

        let candidate = StagedFile {
            path: self.config.staging_dir.join(&name),
            size: bytes.len() as u64,
            name,
        };
        let file_id = candidate.file_id();
        if self.staged.iter().any(|f| f.file_id() == file_id) {
            warn!(file_id = %file_id, "document already uploaded");
            return Ok(UploadOutcome::Duplicate { file_id });
        }

        tokio::fs::write(&candidate.path, bytes).await.map_err(|e| {
            staging_err(format!("failed to write '{}': {e}", candidate.path.display()))
        })?;

        self.staged.retain(|f| f.name != candidate.name);
        self.staged.push(candidate.clone());
        if self.engine.take().is_some() {
            self.processed_files.clear();
            self.config.index_location.clear().await?;
            info!("new upload invalidated the current index; process again to ask questions");
        }

        info!(file_id = %file_id, "document uploaded");
        Ok(UploadOutcome::Staged(candidate))
    }

    /// Stage a file from the local file system.
    ///
    /// # Errors
    ///
    /// [`RagError::Load`] if the file cannot be read, otherwise as
    /// [`upload`](Session::upload).
    pub async fn upload_path(&mut self, path: &Path) -> Result<UploadOutcome> {
        let bytes = tokio::fs::read(path).await.map_err(|e| RagError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RagError::InvalidInput(format!("'{}' is not a file", path.display())))?;
        self.upload(&name, &bytes).await
    }

    /// Build a fresh combined index from every staged file.
    ///
    /// On success the previous index and answer engine are replaced. When no
    /// staged file can be loaded the engine and the persisted index are both
    /// dropped, and the report lists the failures.
    ///
    /// # Errors
    ///
    /// [`RagError::Provider`] or [`RagError::Storage`] abort processing. The
    /// answer engine and the persisted index are left as they were.
    pub async fn process(&mut self) -> Result<IngestReport> {
        if self.staged.is_empty() {
            info!("nothing staged to process");
            return Ok(IngestReport::default());
        }

        let paths: Vec<PathBuf> = self.staged.iter().map(|f| f.path.clone()).collect();
        let (index, report) = self.pipeline.ingest(&paths).await?;

        match index {
            Some(index) => {
                self.engine = Some(self.build_engine(index));
                self.processed_files = report.processed_files.clone();
                info!(
                    processed = self.processed_files.len(),
                    chunk_count = report.chunk_count,
                    "documents processed"
                );
            }
            None => {
                self.engine = None;
                self.processed_files.clear();
                self.config.index_location.clear().await?;
                warn!(failed = report.failures.len(), "no staged document could be processed");
            }
        }
        Ok(report)
    }

    /// Answer a question from the processed documents.
    ///
    /// # Errors
    ///
    /// [`RagError::EmptyIndex`] unless the session is [`SessionStatus::Ready`];
    /// otherwise as [`AnswerEngine::answer`].
    pub async fn ask(&self, question: &str) -> Result<AnswerResult> {
        let engine = self.engine.as_ref().ok_or(RagError::EmptyIndex)?;
        engine.answer(question).await
    }

    /// Return to [`SessionStatus::Empty`].
    ///
    /// Deletes every `.pdf`/`.txt` file in the staging directory and the
    /// persisted index, and drops the answer engine.
    ///
    /// # Errors
    ///
    /// [`RagError::Storage`] if a file cannot be deleted. Handles are dropped
    /// before any file is touched.
    pub async fn reset(&mut self) -> Result<()> {
        self.engine = None;
        self.processed_files.clear();
        self.staged.clear();

        let removed = self.clear_staging_dir().await?;
        self.config.index_location.clear().await?;

        info!(removed, "document pool cleared");
        Ok(())
    }

    fn build_engine(&self, index: Arc<dyn VectorStore>) -> AnswerEngine {
        AnswerEngine::new(
            self.config.rag.clone(),
            Arc::clone(self.pipeline.embedding_provider()),
            index,
            Arc::clone(&self.llm),
        )
    }

    /// Delete accepted document files from the staging directory.
    async fn clear_staging_dir(&self) -> Result<usize> {
        let files = accepted_files_in(&self.config.staging_dir).await?;
        for path in &files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(staging_err(format!(
                        "failed to remove '{}': {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(files.len())
    }

    async fn adopt_staged_files(&mut self) -> Result<()> {
        for path in accepted_files_in(&self.config.staging_dir).await? {
            let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
                staging_err(format!("failed to stat '{}': {e}", path.display()))
            })?;
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            info!(file = %name, "adopting previously staged file");
            self.staged.push(StagedFile { name, size: metadata.len(), path });
        }
        Ok(())
    }

    async fn resume_index(&mut self) -> Result<()> {
        if !matches!(self.config.index_location, IndexLocation::Directory(_)) {
            return Ok(());
        }
        let index = self.config.index_location.open(false).await?;
        if index.is_empty().await {
            return Ok(());
        }

        let mut seen = HashSet::new();
        self.processed_files = index
            .chunks()
            .await
            .into_iter()
            .map(|c| c.document_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        warn!(
            documents = self.processed_files.len(),
            "resumed persisted index from a previous run; open with fresh to start clean"
        );
        self.engine = Some(self.build_engine(index));
        Ok(())
    }
}

fn staging_err(message: String) -> RagError {
    RagError::Storage { backend: STAGING_BACKEND.to_string(), message }
}

/// Accepted document files directly inside `dir`, sorted by path.
async fn accepted_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(staging_err(format!("failed to list '{}': {e}", dir.display()))),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| staging_err(format!("failed to list '{}': {e}", dir.display())))?
    {
        let path = entry.path();
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && DocumentFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
