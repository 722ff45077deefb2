//! Data-only events emitted by a run.
//!
//! The pipeline never touches presentation state. Whatever consumes these
//! events is responsible for moving them onto the thread it renders from.

use super::state::ProgressSnapshot;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Why a single entry did not (fully) succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Source missing, unreadable or corrupt. Nothing was written.
    LoadFailed,
    /// Decoded fine but the encoder rejected it. Nothing was written.
    EncodeFailed,
    /// Output could not be persisted. The source is left untouched.
    WriteFailed,
    /// Output written, but removing or relocating the source failed.
    /// The entry still counts as completed.
    DeleteFailed,
}

/// A non-fatal, per-entry failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub index: usize,
    pub source: PathBuf,
    pub kind: ErrorKind,
    /// Underlying cause, e.g. the decoder or OS error.
    pub detail: String,
}

impl ItemError {
    pub fn new(index: usize, source: &Path, kind: ErrorKind, detail: impl ToString) -> Self {
        Self {
            index,
            source: source.to_path_buf(),
            kind,
            detail: detail.to_string(),
        }
    }

    /// Whether the entry's result still counts toward progress.
    pub fn is_warning(&self) -> bool {
        self.kind == ErrorKind::DeleteFailed
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string());
        match self.kind {
            ErrorKind::LoadFailed => write!(f, "Could not open \"{name}\" ({})", self.detail),
            ErrorKind::EncodeFailed => write!(f, "Could not compress \"{name}\" ({})", self.detail),
            ErrorKind::WriteFailed => {
                write!(f, "Could not save the compressed copy of \"{name}\" ({})", self.detail)
            }
            ErrorKind::DeleteFailed => write!(
                f,
                "Compressed \"{name}\" but could not remove the original ({})",
                self.detail
            ),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Everything known about a run once it has drained.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub progress: ProgressSnapshot,
    /// Entries that ended in `LoadFailed`, `EncodeFailed` or `WriteFailed`.
    pub failed: usize,
    /// Entries never started because cancellation was requested first.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Started {
        total: usize,
        workers: usize,
        original_total_bytes: u64,
    },
    Progress(ProgressSnapshot),
    ItemFailed(ItemError),
    Finished(RunSummary),
}

/// Send an event if anyone is listening. A dropped receiver is not an error.
pub(crate) fn emit(events: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
