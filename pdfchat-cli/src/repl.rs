//! Interactive upload → process → ask loop.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use pdfchat_rag::{
    AnswerResult, DocumentFormat, IngestReport, RagError, Session, SessionStatus, UploadOutcome,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Characters of each source chunk shown under an answer.
pub const SOURCE_PREVIEW_CHARS: usize = 500;

const HELP: &str = "\
Commands:
  upload <path>     stage a .pdf or .txt file
  process           index every staged file
  ask <question>    answer from the processed documents (bare text works too)
  status            show staged and processed files
  reset             delete staged files and the index
  help              show this message
  quit              leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Upload(PathBuf),
    Process,
    Ask(String),
    Status,
    Reset,
    Help,
    Quit,
    Usage(&'static str),
    Empty,
}

impl ReplCommand {
    /// Parse one input line. Anything that is not a command is a question.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "upload" if rest.is_empty() => Self::Usage("upload <path>"),
            "upload" => Self::Upload(PathBuf::from(rest.trim_matches('"'))),
            "ask" if rest.is_empty() => Self::Usage("ask <question>"),
            "ask" => Self::Ask(rest.to_string()),
            "process" if rest.is_empty() => Self::Process,
            "status" if rest.is_empty() => Self::Status,
            "reset" if rest.is_empty() => Self::Reset,
            "help" | "?" if rest.is_empty() => Self::Help,
            "quit" | "exit" if rest.is_empty() => Self::Quit,
            _ => Self::Ask(line.to_string()),
        }
    }
}

pub async fn run(mut session: Session) -> Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!("pdfchat: chat with your PDF and text files. Type `help` for commands.");
    println!("{}", render_status(&session));

    loop {
        let line = match editor.readline("pdfchat> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let command = ReplCommand::parse(&line);
        if command != ReplCommand::Empty {
            let _ = editor.add_history_entry(line.as_str());
        }

        match command {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Usage(usage) => println!("usage: {usage}"),
            ReplCommand::Status => println!("{}", render_status(&session)),
            ReplCommand::Upload(path) => match session.upload_path(&path).await {
                Ok(UploadOutcome::Staged(file)) => {
                    println!("Staged {} ({} bytes). Run `process` to index it.", file.name, file.size)
                }
                Ok(UploadOutcome::Duplicate { file_id }) => {
                    println!("{file_id} is already uploaded.")
                }
                Err(e @ RagError::UnsupportedFormat { .. }) => {
                    eprintln!("error: {e} (accepted: {})", accepted_extensions())
                }
                Err(e) => eprintln!("error: {e}"),
            },
            ReplCommand::Process => {
                println!("Processing {} document(s)...", session.staged_files().len());
                match session.process().await {
                    Ok(report) => print!("{}", render_report(&report)),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            ReplCommand::Ask(question) => match session.ask(&question).await {
                Ok(answer) => print!("{}", render_answer(&answer)),
                Err(RagError::EmptyIndex) => {
                    println!("Upload and process documents before asking questions.")
                }
                Err(e) => eprintln!("error: {e}"),
            },
            ReplCommand::Reset => match session.reset().await {
                Ok(()) => println!("All documents cleared."),
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }

    Ok(())
}

pub fn render_answer(answer: &AnswerResult) -> String {
    let mut out = format!("{}\n", answer.result.trim_end());
    if !answer.source_documents.is_empty() {
        out.push_str("\nSources:\n");
    }
    for (rank, chunk) in answer.source_documents.iter().enumerate() {
        let _ = writeln!(out, "[{}] {} ({})", rank + 1, chunk.document_id, chunk.id);
        let _ = writeln!(out, "{}\n", chunk.preview(SOURCE_PREVIEW_CHARS));
    }
    out
}

pub fn render_report(report: &IngestReport) -> String {
    let mut out = String::new();
    if report.processed_files.is_empty() {
        out.push_str("No document could be processed.\n");
    } else {
        let _ = writeln!(
            out,
            "Processed {} document(s) into {} chunk(s): {}",
            report.processed_files.len(),
            report.chunk_count,
            report.processed_files.join(", ")
        );
    }
    for failure in &report.failures {
        let _ = writeln!(out, "  skipped {}: {}", failure.path.display(), failure.error);
    }
    out
}

fn accepted_extensions() -> String {
    DocumentFormat::ALL.iter().map(|f| format!(".{}", f.extension())).collect::<Vec<_>>().join(", ")
}

fn render_status(session: &Session) -> String {
    let mut out = match session.status() {
        SessionStatus::Empty => "No documents uploaded.".to_string(),
        SessionStatus::Staged => "Documents staged; run `process` before asking.".to_string(),
        SessionStatus::Ready => "Ready for questions.".to_string(),
    };
    for file in session.staged_files() {
        let _ = write!(out, "\n  staged    {}", file.file_id());
    }
    for id in session.processed_files() {
        let _ = write!(out, "\n  processed {id}");
    }
    out
}
