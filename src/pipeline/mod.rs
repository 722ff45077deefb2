//! Concurrent batch recompression.
//!
//! A run is driven by a [`PipelineController`] and flows through four parts:
//!
//! ```text
//! entries ─▶ WorkerPool ──(job per entry)──▶ JobResultQueue
//!                                                  │ drained every tick
//!                                                  ▼
//!                        ProgressAggregator ─▶ RunState ─▶ PipelineEvent
//! ```
//!
//! Workers never touch [`RunState`]. They only push completed [`JobRecord`]s
//! onto the queue, and the aggregator folds them in on a fixed cadence plus
//! one final drain once the pool has stopped. All observable progress flows
//! out through [`PipelineEvent`]s.
//!
//! [`JobRecord`]: crate::types::JobRecord

pub mod aggregator;
pub mod controller;
pub mod events;
pub mod job;
pub mod pool;
pub mod queue;
pub mod state;

pub use aggregator::ProgressAggregator;
pub use controller::{Phase, PipelineController};
pub use events::{ErrorKind, ItemError, PipelineEvent, RunStatus, RunSummary};
pub use job::{OUTPUT_SUFFIX, OutputClaims, resolve_output_path};
pub use pool::{PoolReport, WorkerPool};
pub use queue::JobResultQueue;
pub use state::{ProgressSnapshot, RunState};

use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no images to process")]
    NoEntries,
    #[error("a run is already in progress")]
    AlreadyRunning,
    #[error("no run has been started")]
    NotStarted,
    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("could not spawn pipeline thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("pipeline thread panicked")]
    RunnerPanicked,
}

/// Lock a mutex, recovering the data if a worker panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
