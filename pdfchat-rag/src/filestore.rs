//! Directory-backed persistent vector store.
//!
//! [`FileVectorStore`] keeps the index in memory for search and mirrors it to
//! a JSON snapshot (`index.json`) in a caller-supplied directory. Every
//! [`add`](VectorStore::add) commits a new snapshot by writing a temporary
//! file and renaming it over the old one, so an interrupted or failed write
//! leaves the previously committed snapshot intact.
//!
//! Reopening a directory resumes its contents. Pass `fresh = true` to
//! [`FileVectorStore::open`] when leftovers from an earlier run must not leak
//! into a new session.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, check_dimensions, rank};

const BACKEND: &str = "File";
const SNAPSHOT_FILE: &str = "index.json";
const SNAPSHOT_TMP_FILE: &str = "index.json.tmp";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    dimensions: Option<usize>,
    chunks: Vec<Chunk>,
}

#[derive(Debug)]
struct State {
    created_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
}

impl State {
    fn empty() -> Self {
        Self { created_at: Utc::now(), chunks: Vec::new() }
    }

    fn dimensions(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len())
    }
}

/// A persistent [`VectorStore`] stored under a directory.
///
/// # Example
///
/// ```rust,ignore
/// use pdfchat_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::open("./index_db", true).await?;
/// store.add(&chunks).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    dir: PathBuf,
    state: RwLock<State>,
}

impl FileVectorStore {
    /// Open (or create) the index stored in `dir`.
    ///
    /// With `fresh`, an existing snapshot is deleted before opening.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if the directory cannot be created or the
    /// existing snapshot cannot be read or parsed.
    pub async fn open(dir: impl AsRef<Path>, fresh: bool) -> Result<Self> {
        let dir = create_dir(dir.as_ref()).await?;
        if fresh {
            Self::clear(&dir).await?;
        }

        let state = read_snapshot(&dir).await?.unwrap_or_else(State::empty);
        info!(
            index.dir = %dir.display(),
            fresh,
            chunk_count = state.chunks.len(),
            "opened file index"
        );
        Ok(Self { dir, state: RwLock::new(state) })
    }

    /// Start an empty index in `dir` without touching the snapshot already there.
    ///
    /// The old snapshot is overwritten by the first successful commit
    /// ([`add`](VectorStore::add) or [`persist`](VectorStore::persist)); if
    /// that commit fails it is still on disk.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if the directory cannot be created.
    pub async fn replacing(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = create_dir(dir.as_ref()).await?;
        debug!(index.dir = %dir.display(), "opened replacement file index");
        Ok(Self { dir, state: RwLock::new(State::empty()) })
    }

    /// Delete the snapshot in `dir`, if any. The directory itself is kept.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Storage`] if an existing snapshot cannot be removed.
    pub async fn clear(dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        for name in [SNAPSHOT_FILE, SNAPSHOT_TMP_FILE] {
            let path = dir.join(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed index snapshot"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(storage_err(format!(
                        "failed to remove '{}': {e}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// The directory this index is persisted in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_snapshot(&self, state: &State) -> Result<()> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            created_at: state.created_at,
            dimensions: state.dimensions(),
            chunks: &state.chunks,
        };
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| storage_err(format!("failed to serialize index: {e}")))?;

        let tmp = self.dir.join(SNAPSHOT_TMP_FILE);
        let target = self.dir.join(SNAPSHOT_FILE);
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| storage_err(format!("failed to write '{}': {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &target)
            .await
            .map_err(|e| storage_err(format!("failed to commit '{}': {e}", target.display())))?;

        debug!(path = %target.display(), chunk_count = state.chunks.len(), "committed index snapshot");
        Ok(())
    }
}

/// Borrowing twin of [`Snapshot`] so commits don't clone every chunk.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    chunks: &'a [Chunk],
}

fn storage_err(message: String) -> RagError {
    RagError::Storage { backend: BACKEND.to_string(), message }
}

async fn create_dir(dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| storage_err(format!("failed to create '{}': {e}", dir.display())))?;
    Ok(dir.to_path_buf())
}

async fn read_snapshot(dir: &Path) -> Result<Option<State>> {
    let path = dir.join(SNAPSHOT_FILE);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_err(format!("failed to read '{}': {e}", path.display()))),
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| storage_err(format!("corrupt snapshot '{}': {e}", path.display())))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(storage_err(format!(
            "unsupported snapshot version {} in '{}'",
            snapshot.version,
            path.display()
        )));
    }
    check_dimensions(BACKEND, snapshot.dimensions, &snapshot.chunks)?;

    Ok(Some(State { created_at: snapshot.created_at, chunks: snapshot.chunks }))
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let mut state = self.state.write().await;
        check_dimensions(BACKEND, state.dimensions(), chunks)?;

        let committed = state.chunks.len();
        state.chunks.extend_from_slice(chunks);
        if let Err(e) = self.write_snapshot(&state).await {
            state.chunks.truncate(committed);
            error!(index.dir = %self.dir.display(), error = %e, "index commit failed");
            return Err(e);
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        Ok(rank(&state.chunks, embedding, top_k))
    }

    async fn len(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    async fn chunks(&self) -> Vec<Chunk> {
        self.state.read().await.chunks.clone()
    }

    async fn persist(&self) -> Result<()> {
        let state = self.state.read().await;
        self.write_snapshot(&state).await
    }

    async fn reload(&self) -> Result<()> {
        let reloaded = read_snapshot(&self.dir).await?.unwrap_or_else(State::empty);
        let mut state = self.state.write().await;
        *state = reloaded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.into(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            document_id: "a.txt".into(),
        }
    }

    #[tokio::test]
    async fn reopening_resumes_committed_chunks() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileVectorStore::open(dir.path(), false).await.unwrap();
            store.add(&[chunk("a", vec![1.0, 0.0])]).await.unwrap();
            store.add(&[chunk("b", vec![0.0, 1.0])]).await.unwrap();
        }

        let store = FileVectorStore::open(dir.path(), false).await.unwrap();
        assert_eq!(store.len().await, 2);
        let results = store.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].chunk.id, "b");
    }

    #[tokio::test]
    async fn fresh_open_discards_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path(), false).await.unwrap();
        store.add(&[chunk("stale", vec![1.0])]).await.unwrap();
        drop(store);

        let store = FileVectorStore::open(dir.path(), true).await.unwrap();
        assert!(store.is_empty().await);
        assert!(!dir.path().join(SNAPSHOT_FILE).exists());
    }

    #[tokio::test]
    async fn duplicate_adds_create_duplicate_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path(), true).await.unwrap();
        let batch = [chunk("a", vec![1.0, 0.0])];
        store.add(&batch).await.unwrap();
        store.add(&batch).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn rejected_batch_leaves_committed_entries_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path(), true).await.unwrap();
        store.add(&[chunk("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store.add(&[chunk("b", vec![1.0, 0.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::Storage { .. }));

        store.reload().await.unwrap();
        let ids: Vec<String> = store.chunks().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn reload_drops_uncommitted_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path(), true).await.unwrap();
        store.add(&[chunk("a", vec![1.0])]).await.unwrap();

        FileVectorStore::clear(dir.path()).await.unwrap();
        store.reload().await.unwrap();
        assert!(store.is_empty().await);

        store.persist().await.unwrap();
        assert!(dir.path().join(SNAPSHOT_FILE).exists());
    }

    #[tokio::test]
    async fn replacement_keeps_old_snapshot_until_it_commits() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVectorStore::open(dir.path(), true).await.unwrap();
        store.add(&[chunk("old", vec![1.0, 0.0])]).await.unwrap();
        drop(store);

        // A directory in the temp file's place makes the next commit fail.
        std::fs::create_dir(dir.path().join(SNAPSHOT_TMP_FILE)).unwrap();
        let replacement = FileVectorStore::replacing(dir.path()).await.unwrap();
        assert!(replacement.is_empty().await);
        let err = replacement.add(&[chunk("new", vec![0.0, 1.0])]).await.unwrap_err();
        assert!(matches!(err, RagError::Storage { .. }));
        assert!(replacement.is_empty().await);

        let resumed = FileVectorStore::open(dir.path(), false).await.unwrap();
        let ids: Vec<String> = resumed.chunks().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["old"]);

        std::fs::remove_dir(dir.path().join(SNAPSHOT_TMP_FILE)).unwrap();
        replacement.add(&[chunk("new", vec![0.0, 1.0])]).await.unwrap();
        let resumed = FileVectorStore::open(dir.path(), false).await.unwrap();
        let ids: Vec<String> = resumed.chunks().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), b"{ not json").unwrap();
        let err = FileVectorStore::open(dir.path(), false).await.unwrap_err();
        assert!(matches!(err, RagError::Storage { ref message, .. } if message.contains("corrupt")));
    }
}
