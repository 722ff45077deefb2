//! Accumulator between workers and the progress aggregator.
//!
//! Workers push one record per successful job; the aggregator takes the whole
//! backlog in one swap. The lock is held only for the append or the swap,
//! never across encode or write I/O.

use super::lock;
use crate::types::JobRecord;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct JobResultQueue {
    records: Mutex<Vec<JobRecord>>,
}

impl JobResultQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: JobRecord) {
        lock(&self.records).push(record);
    }

    /// Atomically take and clear everything pushed so far.
    pub fn drain_all(&self) -> Vec<JobRecord> {
        std::mem::take(&mut *lock(&self.records))
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
