//! Periodic drain of the result queue into the run state.
//!
//! A single ticker thread drains on a fixed cadence, so ticks never overlap:
//! a slow tick pushes the next one back instead of running beside it. The
//! controller stops the ticker once the pool has drained and then performs
//! one last [`ProgressAggregator::final_drain`].

use super::events::{PipelineEvent, emit};
use super::lock;
use super::queue::JobResultQueue;
use super::state::{ProgressSnapshot, RunState};
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::trace;

pub struct ProgressAggregator {
    queue: Arc<JobResultQueue>,
    state: Arc<Mutex<RunState>>,
    events: Option<Sender<PipelineEvent>>,
}

impl ProgressAggregator {
    pub fn new(
        queue: Arc<JobResultQueue>,
        state: Arc<Mutex<RunState>>,
        events: Option<Sender<PipelineEvent>>,
    ) -> Self {
        Self {
            queue,
            state,
            events,
        }
    }

    /// Drain the queue and fold the batch into the run state.
    ///
    /// Returns the number of records applied. An empty queue is a no-op and
    /// emits nothing.
    pub fn tick(&self) -> usize {
        let batch = self.queue.drain_all();
        if batch.is_empty() {
            return 0;
        }
        let snapshot = {
            let mut state = lock(&self.state);
            state.apply(&batch);
            state.snapshot()
        };
        trace!(applied = batch.len(), fraction = snapshot.fraction, "progress tick");
        emit(self.events.as_ref(), PipelineEvent::Progress(snapshot));
        batch.len()
    }

    /// Apply whatever is left and always publish the resulting snapshot.
    pub fn final_drain(&self) -> ProgressSnapshot {
        let batch = self.queue.drain_all();
        let snapshot = {
            let mut state = lock(&self.state);
            state.apply(&batch);
            state.snapshot()
        };
        emit(self.events.as_ref(), PipelineEvent::Progress(snapshot.clone()));
        snapshot
    }

    /// Start ticking every `interval` on a dedicated thread.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> io::Result<Ticker> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("recompress-progress".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            self.tick();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Ticker {
            stop: stop_tx,
            handle,
        })
    }
}

/// Handle to a running ticker thread.
pub struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Stop ticking and wait for an in-progress tick to finish.
    pub fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}
