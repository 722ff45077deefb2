//! Bounded parallel execution of a run's jobs.
//!
//! Each run gets its own rayon pool sized to the concurrency ceiling, so no
//! more than `workers` jobs are ever mid-flight. Entries are fed as
//! single-item tasks; an idle worker steals the next one as soon as its
//! previous job finishes.

use super::PipelineError;
use super::job::{JobContext, run_job};
use crate::types::JobOutcome;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// Job counts once the pool has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Never started because the cancellation flag was already set.
    pub skipped: usize,
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, PipelineError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("recompress-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Attempt every source exactly once, unless `cancel` is observed first.
    ///
    /// Blocks until every started job has reached a terminal state. Jobs
    /// already running when `cancel` is set are allowed to finish.
    pub fn run(&self, sources: &[PathBuf], ctx: &JobContext, cancel: &AtomicBool) -> PoolReport {
        let started = AtomicUsize::new(0);
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        self.pool.install(|| {
            sources
                .par_iter()
                .with_max_len(1)
                .enumerate()
                .for_each(|(index, source)| {
                    if cancel.load(Ordering::Acquire) {
                        skipped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    started.fetch_add(1, Ordering::Relaxed);
                    match run_job(ctx, index, source) {
                        JobOutcome::Success => succeeded.fetch_add(1, Ordering::Relaxed),
                        _ => failed.fetch_add(1, Ordering::Relaxed),
                    };
                });
        });

        let report = PoolReport {
            started: started.into_inner(),
            succeeded: succeeded.into_inner(),
            failed: failed.into_inner(),
            skipped: skipped.into_inner(),
        };
        debug!(?report, "pool drained");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::imaging::codec::tests::MockCodec;
    use crate::pipeline::job::OutputClaims;
    use crate::pipeline::queue::JobResultQueue;
    use crate::types::{Format, PipelineConfig, Tier};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sources(tmp: &TempDir, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = tmp.path().join(format!("img{i}.png"));
                std::fs::write(&path, b"x").unwrap();
                path
            })
            .collect()
    }

    fn context(codec: Arc<MockCodec>, out: &TempDir) -> JobContext {
        JobContext {
            codec,
            codec_config: Arc::new(Config::default()),
            run: PipelineConfig::new(Format::Jpeg, Tier::Medium).with_destination(out.path()),
            queue: Arc::new(JobResultQueue::new()),
            claims: OutputClaims::new(),
            events: None,
        }
    }

    #[test]
    fn every_entry_processed_exactly_once() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let sources = sources(&src, 40);
        let codec = Arc::new(MockCodec::new(4));
        let ctx = context(Arc::clone(&codec), &out);

        let report = WorkerPool::new(4).unwrap().run(&sources, &ctx, &AtomicBool::new(false));

        assert_eq!(report.started, 40);
        assert_eq!(report.succeeded, 40);
        assert_eq!(report.skipped, 0);

        let encoded = codec.encoded_sources();
        assert_eq!(encoded.len(), 40);
        let unique: HashSet<_> = encoded.into_iter().collect();
        assert_eq!(unique.len(), 40);

        let indices: HashSet<usize> = ctx.queue.drain_all().iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..40).collect());
    }

    #[test]
    fn concurrency_never_exceeds_ceiling() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let sources = sources(&src, 16);
        let codec = Arc::new(MockCodec::with_delay(1, Duration::from_millis(10)));
        let ctx = context(Arc::clone(&codec), &out);

        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.workers(), 2);
        pool.run(&sources, &ctx, &AtomicBool::new(false));

        assert!(codec.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(WorkerPool::new(0).unwrap().workers(), 1);
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let sources = sources(&src, 5);
        let codec = Arc::new(MockCodec::new(1));
        let ctx = context(Arc::clone(&codec), &out);

        let report = WorkerPool::new(2).unwrap().run(&sources, &ctx, &AtomicBool::new(true));

        assert_eq!(report.started, 0);
        assert_eq!(report.skipped, 5);
        assert!(codec.encoded_sources().is_empty());
        assert!(ctx.queue.is_empty());
    }

    #[test]
    fn failures_counted_separately() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let mut sources = sources(&src, 3);
        sources.push(src.path().join("missing.png"));
        let ctx = context(Arc::new(MockCodec::new(1)), &out);

        let report = WorkerPool::new(2).unwrap().run(&sources, &ctx, &AtomicBool::new(false));

        assert_eq!(report.started, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(ctx.queue.len(), 3);
    }
}
