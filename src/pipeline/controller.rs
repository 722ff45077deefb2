//! Orchestration of a full run.
//!
//! ```text
//! Idle ──start──▶ Running ──────────────────────▶ Completed
//!                    │
//!                 cancel
//!                    ▼
//!                Cancelling ──pool drained──▶ Cancelled
//! ```
//!
//! `start` returns as soon as the run is launched. The run itself lives on a
//! dedicated thread that drives the worker pool, keeps the progress ticker
//! alive until the pool drains, performs the final drain and only then
//! publishes the terminal state. A finished controller can be started again.

use super::aggregator::ProgressAggregator;
use super::events::{PipelineEvent, RunStatus, RunSummary, emit};
use super::job::{JobContext, OutputClaims};
use super::lock;
use super::pool::WorkerPool;
use super::queue::JobResultQueue;
use super::state::{ProgressSnapshot, RunState};
use super::PipelineError;
use crate::config::{self, Config};
use crate::imaging::ImageCodec;
use crate::types::{PipelineConfig, SourceEntry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    /// Cancellation requested; in-flight jobs are still finishing.
    Cancelling,
    Completed,
    Cancelled,
}

impl Phase {
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Running | Phase::Cancelling)
    }
}

/// State shared between the controller and its run thread.
struct Shared {
    phase: Mutex<Phase>,
    cancel: AtomicBool,
    state: Arc<Mutex<RunState>>,
}

pub struct PipelineController {
    codec: Arc<dyn ImageCodec>,
    config: Arc<Config>,
    shared: Arc<Shared>,
    runner: Mutex<Option<JoinHandle<RunSummary>>>,
}

impl PipelineController {
    pub fn new(codec: Arc<dyn ImageCodec>, config: Config) -> Self {
        Self {
            codec,
            config: Arc::new(config),
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Idle),
                cancel: AtomicBool::new(false),
                state: Arc::new(Mutex::new(RunState::default())),
            }),
            runner: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        *lock(&self.shared.phase)
    }

    /// Current aggregate progress of the active (or last) run.
    pub fn progress(&self) -> ProgressSnapshot {
        lock(&self.shared.state).snapshot()
    }

    /// Entries of the active (or last) run, with compressed sizes attached so far.
    pub fn entries(&self) -> Vec<SourceEntry> {
        lock(&self.shared.state).entries().to_vec()
    }

    /// Launch a run over `entries`.
    ///
    /// Rejected without side effects when `entries` is empty or a run is
    /// already active.
    pub fn start(
        &self,
        entries: Vec<SourceEntry>,
        run: PipelineConfig,
        events: Option<Sender<PipelineEvent>>,
    ) -> Result<(), PipelineError> {
        let mut phase = lock(&self.shared.phase);
        if phase.is_active() {
            return Err(PipelineError::AlreadyRunning);
        }
        if entries.is_empty() {
            return Err(PipelineError::NoEntries);
        }

        // Reap the previous run's thread; it has already finished.
        if let Some(previous) = lock(&self.runner).take() {
            let _ = previous.join();
        }

        let pool = WorkerPool::new(config::effective_workers(&self.config.processing))?;
        let sources: Vec<PathBuf> = entries.iter().map(|e| e.path().to_path_buf()).collect();
        let state = RunState::new(entries);
        let total = state.total();
        let original_total_bytes = state.original_total_bytes;
        *lock(&self.shared.state) = state;
        self.shared.cancel.store(false, Ordering::Release);

        info!(
            entries = total,
            workers = pool.workers(),
            format = %run.format,
            tier = %run.tier,
            original_total_bytes,
            "run started"
        );
        emit(
            events.as_ref(),
            PipelineEvent::Started {
                total,
                workers: pool.workers(),
                original_total_bytes,
            },
        );

        let queue = Arc::new(JobResultQueue::new());
        let aggregator = Arc::new(ProgressAggregator::new(
            Arc::clone(&queue),
            Arc::clone(&self.shared.state),
            events.clone(),
        ));
        let ctx = JobContext {
            codec: Arc::clone(&self.codec),
            codec_config: Arc::clone(&self.config),
            run,
            queue,
            claims: OutputClaims::new(),
            events: events.clone(),
        };
        let shared = Arc::clone(&self.shared);
        let interval = self.config.processing.tick_interval();

        let handle = thread::Builder::new()
            .name("recompress-run".into())
            .spawn(move || execute_run(pool, sources, ctx, aggregator, shared, interval, events))?;

        *phase = Phase::Running;
        *lock(&self.runner) = Some(handle);
        Ok(())
    }

    /// Request cancellation. No new jobs start; in-flight jobs finish and count.
    ///
    /// Returns `false` when there is no active run to cancel.
    pub fn cancel(&self) -> bool {
        let mut phase = lock(&self.shared.phase);
        if *phase != Phase::Running {
            return false;
        }
        self.shared.cancel.store(true, Ordering::Release);
        lock(&self.shared.state).cancel_requested = true;
        *phase = Phase::Cancelling;
        info!("cancellation requested");
        true
    }

    /// Block until the current run reaches its terminal state.
    pub fn wait(&self) -> Result<RunSummary, PipelineError> {
        let handle = lock(&self.runner).take().ok_or(PipelineError::NotStarted)?;
        handle.join().map_err(|_| PipelineError::RunnerPanicked)
    }

    /// Start a run and wait for it.
    pub fn run(
        &self,
        entries: Vec<SourceEntry>,
        run: PipelineConfig,
        events: Option<Sender<PipelineEvent>>,
    ) -> Result<RunSummary, PipelineError> {
        self.start(entries, run, events)?;
        self.wait()
    }
}

fn execute_run(
    pool: WorkerPool,
    sources: Vec<PathBuf>,
    ctx: JobContext,
    aggregator: Arc<ProgressAggregator>,
    shared: Arc<Shared>,
    interval: Duration,
    events: Option<Sender<PipelineEvent>>,
) -> RunSummary {
    let ticker = match Arc::clone(&aggregator).spawn(interval) {
        Ok(ticker) => Some(ticker),
        Err(err) => {
            warn!("progress ticker unavailable, reporting at the end only: {err}");
            None
        }
    };

    let report = pool.run(&sources, &ctx, &shared.cancel);

    if let Some(ticker) = ticker {
        ticker.stop();
    }
    let progress = aggregator.final_drain();

    let status = if shared.cancel.load(Ordering::Acquire) {
        RunStatus::Cancelled
    } else {
        RunStatus::Completed
    };
    lock(&shared.state).running = false;
    *lock(&shared.phase) = match status {
        RunStatus::Completed => Phase::Completed,
        RunStatus::Cancelled => Phase::Cancelled,
    };

    let summary = RunSummary {
        status,
        progress,
        failed: report.failed,
        skipped: report.skipped,
    };
    info!(
        status = ?summary.status,
        completed = summary.progress.completed,
        failed = summary.failed,
        skipped = summary.skipped,
        compressed_total_bytes = summary.progress.compressed_total_bytes,
        "run finished"
    );
    emit(events.as_ref(), PipelineEvent::Finished(summary.clone()));
    summary
}
