//! End-to-end session scenarios: upload → process → ask → reset.

use std::sync::Arc;

use pdfchat_rag::{
    IndexLocation, MockEmbeddingProvider, MockLlm, RagConfig, RagError, Session, SessionConfig,
    SessionStatus, UploadOutcome,
};
use tempfile::TempDir;

const ALPHA: &str = "Alpha Beta. Gamma Delta.";

struct Fixture {
    staging: TempDir,
    index: TempDir,
    llm: Arc<MockLlm>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            staging: tempfile::tempdir().unwrap(),
            index: tempfile::tempdir().unwrap(),
            llm: Arc::new(MockLlm::new("Alpha is the first item listed in the document.")),
        }
    }

    fn config(&self, fresh: bool) -> SessionConfig {
        SessionConfig {
            staging_dir: self.staging.path().to_path_buf(),
            index_location: IndexLocation::Directory(self.index.path().to_path_buf()),
            fresh,
            rag: RagConfig::default(),
        }
    }

    async fn open(&self, fresh: bool) -> Session {
        Session::open(
            self.config(fresh),
            Arc::new(MockEmbeddingProvider::new(64)),
            self.llm.clone(),
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn single_text_file_scenario() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    assert_eq!(session.status(), SessionStatus::Empty);

    let outcome = session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    let UploadOutcome::Staged(staged) = outcome else { panic!("expected a staged upload") };
    assert_eq!(staged.file_id(), "a.txt_24");
    assert!(fx.staging.path().join("a.txt").exists());
    assert_eq!(session.status(), SessionStatus::Staged);

    let report = session.process().await.unwrap();
    assert_eq!(report.processed_files, vec!["a.txt"]);
    assert_eq!(report.chunk_count, 1);
    assert_eq!(session.status(), SessionStatus::Ready);

    let answer = session.ask("What is Alpha?").await.unwrap();
    assert_eq!(answer.query, "What is Alpha?");
    assert!(!answer.result.is_empty());
    assert_eq!(answer.source_documents.len(), 1);
    assert_eq!(answer.source_documents[0].text, ALPHA);

    let prompts = fx.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(&format!("<context>\n{ALPHA}\n</context>")));
    assert!(prompts[0].contains("Question: What is Alpha?"));
}

#[tokio::test]
async fn duplicate_upload_is_ignored() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;

    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    let second = session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    assert_eq!(second, UploadOutcome::Duplicate { file_id: "a.txt_24".into() });
    assert_eq!(session.staged_files().len(), 1);

    session.process().await.unwrap();
    assert_eq!(session.processed_files().len(), 1);
}

#[tokio::test]
async fn same_name_with_new_size_replaces_staged_file() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;

    session.upload("a.txt", b"first version").await.unwrap();
    session.upload("a.txt", b"second, longer version").await.unwrap();
    assert_eq!(session.staged_files().len(), 1);
    assert_eq!(
        std::fs::read_to_string(fx.staging.path().join("a.txt")).unwrap(),
        "second, longer version"
    );
}

#[tokio::test]
async fn ask_before_process_is_rejected() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    assert!(matches!(session.ask("anything?").await, Err(RagError::EmptyIndex)));

    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    assert!(matches!(session.ask("anything?").await, Err(RagError::EmptyIndex)));
    assert!(fx.llm.prompts().is_empty());
}

#[tokio::test]
async fn reset_clears_files_and_handles() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    session.upload("b.txt", b"Epsilon Zeta").await.unwrap();
    session.process().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Ready);

    session.reset().await.unwrap();

    assert_eq!(session.status(), SessionStatus::Empty);
    assert!(session.staged_files().is_empty());
    assert!(session.processed_files().is_empty());
    assert!(!fx.staging.path().join("a.txt").exists());
    assert!(!fx.staging.path().join("b.txt").exists());
    assert!(!fx.index.path().join("index.json").exists());
    assert!(matches!(session.ask("What is Alpha?").await, Err(RagError::EmptyIndex)));

    let reopened = fx.open(false).await;
    assert_eq!(reopened.status(), SessionStatus::Empty);
}

#[tokio::test]
async fn upload_after_ready_requires_reprocessing() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    session.process().await.unwrap();

    session.upload("b.txt", b"Epsilon Zeta").await.unwrap();
    assert_eq!(session.status(), SessionStatus::Staged);
    assert!(session.processed_files().is_empty());
    assert!(!fx.index.path().join("index.json").exists());
    assert!(matches!(session.ask("What is Alpha?").await, Err(RagError::EmptyIndex)));

    let report = session.process().await.unwrap();
    assert_eq!(report.processed_files, vec!["a.txt", "b.txt"]);
    assert_eq!(session.index().unwrap().len().await, 2);
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    let err = session.upload("notes.docx", b"data").await.unwrap_err();
    assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    assert_eq!(session.status(), SessionStatus::Empty);
}

#[tokio::test]
async fn upload_name_cannot_escape_staging_dir() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    let outcome = session.upload("../../etc/a.txt", ALPHA.as_bytes()).await.unwrap();
    let UploadOutcome::Staged(staged) = outcome else { panic!("expected a staged upload") };
    assert_eq!(staged.path, fx.staging.path().join("a.txt"));
}

#[tokio::test]
async fn reopening_without_fresh_resumes_previous_run() {
    let fx = Fixture::new();
    {
        let mut session = fx.open(true).await;
        session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
        session.process().await.unwrap();
    }

    let resumed = fx.open(false).await;
    assert_eq!(resumed.status(), SessionStatus::Ready);
    assert_eq!(resumed.processed_files(), ["a.txt".to_string()]);
    assert_eq!(resumed.staged_files().len(), 1);
    assert_eq!(resumed.staged_files()[0].file_id(), "a.txt_24");
    assert!(resumed.ask("What is Alpha?").await.is_ok());

    let fresh = fx.open(true).await;
    assert_eq!(fresh.status(), SessionStatus::Empty);
    assert!(!fx.staging.path().join("a.txt").exists());
}

#[tokio::test]
async fn process_with_nothing_loadable_stays_staged() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    std::fs::remove_file(fx.staging.path().join("a.txt")).unwrap();

    let report = session.process().await.unwrap();
    assert!(report.processed_files.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(session.status(), SessionStatus::Staged);
}

#[tokio::test]
async fn failed_rebuild_does_not_resume_discarded_index() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    session.process().await.unwrap();

    session.upload("a.txt", b"Alpha Beta. Gamma Delta. Epsilon.").await.unwrap();
    std::fs::remove_file(fx.staging.path().join("a.txt")).unwrap();
    let report = session.process().await.unwrap();
    assert!(report.processed_files.is_empty());
    assert_eq!(session.status(), SessionStatus::Staged);
    assert!(session.processed_files().is_empty());
    assert!(!fx.index.path().join("index.json").exists());
    drop(session);

    let reopened = fx.open(false).await;
    assert_ne!(reopened.status(), SessionStatus::Ready);
    assert!(reopened.processed_files().is_empty());
    assert!(matches!(reopened.ask("What is Alpha?").await, Err(RagError::EmptyIndex)));
}

#[tokio::test]
async fn storage_failure_during_process_keeps_previous_index() {
    let fx = Fixture::new();
    let mut session = fx.open(true).await;
    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    session.process().await.unwrap();

    // A directory where the snapshot's temp file goes makes the commit fail.
    let blocker = fx.index.path().join("index.json.tmp");
    std::fs::create_dir(&blocker).unwrap();
    let err = session.process().await.unwrap_err();
    assert!(matches!(err, RagError::Storage { .. }));

    assert_eq!(session.status(), SessionStatus::Ready);
    assert_eq!(session.processed_files(), ["a.txt".to_string()]);
    assert!(session.ask("What is Alpha?").await.is_ok());
    std::fs::remove_dir(&blocker).unwrap();
    drop(session);

    let resumed = fx.open(false).await;
    assert_eq!(resumed.status(), SessionStatus::Ready);
    assert_eq!(resumed.processed_files(), ["a.txt".to_string()]);
}

#[tokio::test]
async fn provider_failure_during_process_is_reported() {
    let staging = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        staging_dir: staging.path().to_path_buf(),
        index_location: IndexLocation::InMemory,
        fresh: true,
        rag: RagConfig::default(),
    };
    let mut session = Session::open(
        config,
        Arc::new(MockEmbeddingProvider::new(8).failing("network down")),
        Arc::new(MockLlm::new("unused")),
    )
    .await
    .unwrap();

    session.upload("a.txt", ALPHA.as_bytes()).await.unwrap();
    let err = session.process().await.unwrap_err();
    assert!(matches!(err, RagError::Provider { .. }));
    assert_eq!(session.status(), SessionStatus::Staged);
}

#[tokio::test]
async fn upload_path_stages_a_local_file() {
    let fx = Fixture::new();
    let source = tempfile::tempdir().unwrap();
    let path = source.path().join("notes.TXT");
    std::fs::write(&path, ALPHA).unwrap();

    let mut session = fx.open(true).await;
    let outcome = session.upload_path(&path).await.unwrap();
    assert!(matches!(outcome, UploadOutcome::Staged(ref f) if f.name == "notes.TXT"));
    assert!(fx.staging.path().join("notes.TXT").exists());

    let missing = session.upload_path(&source.path().join("gone.pdf")).await.unwrap_err();
    assert!(matches!(missing, RagError::Load { .. }));
}
