//! Mutable aggregate state of one run.
//!
//! Only the progress aggregator's drain step and `cancel()` write to a
//! [`RunState`]; workers never see it.

use crate::types::{JobRecord, SourceEntry};
use serde::Serialize;
use tracing::warn;

/// Point-in-time view of a run's progress, as handed to the display layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// `completed / total`, in `[0, 1]`.
    pub fraction: f64,
    pub completed: usize,
    pub total: usize,
    pub original_total_bytes: u64,
    pub compressed_total_bytes: u64,
    /// Original size of the entries that have completed so far. The baseline
    /// `compressed_total_bytes` is measured against.
    pub completed_original_bytes: u64,
    /// Compressed size per entry, in entry order. `None` until the entry completes.
    pub per_entry_compressed: Vec<Option<u64>>,
}

impl ProgressSnapshot {
    /// Percentage saved by the completed outputs relative to their own
    /// sources, or `None` before anything has completed.
    ///
    /// Failed, skipped and pending entries are left out on both sides.
    pub fn savings_percent(&self) -> Option<f64> {
        if self.completed == 0 || self.completed_original_bytes == 0 {
            return None;
        }
        let saved = self.completed_original_bytes as f64 - self.compressed_total_bytes as f64;
        Some(saved / self.completed_original_bytes as f64 * 100.0)
    }
}

#[derive(Debug, Default)]
pub struct RunState {
    entries: Vec<SourceEntry>,
    pub original_total_bytes: u64,
    pub compressed_total_bytes: u64,
    pub completed: usize,
    pub fraction: f64,
    pub cancel_requested: bool,
    pub running: bool,
}

impl RunState {
    /// Fresh state for a run over `entries`.
    ///
    /// Original sizes are re-read from disk now; unreadable entries count as 0.
    pub fn new(mut entries: Vec<SourceEntry>) -> Self {
        let mut original_total_bytes = 0;
        for entry in &mut entries {
            entry.original_size = std::fs::metadata(entry.path()).ok().map(|m| m.len());
            entry.compressed_size = None;
            original_total_bytes += entry.original_size.unwrap_or(0);
        }
        Self {
            entries,
            original_total_bytes,
            running: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Fold a drained batch into the totals and recompute the fraction.
    pub fn apply(&mut self, records: &[JobRecord]) {
        for record in records {
            let Some(entry) = self.entries.get_mut(record.index) else {
                warn!(index = record.index, "dropping record for unknown entry");
                continue;
            };
            entry.compressed_size = Some(record.bytes);
            self.completed += 1;
            self.compressed_total_bytes += record.bytes;
        }
        if !self.entries.is_empty() {
            let fraction = (self.completed as f64 / self.entries.len() as f64).min(1.0);
            // Never move backwards within a run
            self.fraction = self.fraction.max(fraction);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            fraction: self.fraction,
            completed: self.completed,
            total: self.entries.len(),
            original_total_bytes: self.original_total_bytes,
            compressed_total_bytes: self.compressed_total_bytes,
            completed_original_bytes: self
                .entries
                .iter()
                .filter(|e| e.compressed_size.is_some())
                .filter_map(|e| e.original_size)
                .sum(),
            per_entry_compressed: self.entries.iter().map(|e| e.compressed_size).collect(),
        }
    }
}
