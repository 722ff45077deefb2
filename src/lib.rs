//! # recompress
//!
//! Batch image recompression. A list of source images is re-encoded to JPEG
//! or lossy WebP at one of three quality tiers, on a bounded pool of worker
//! threads, with aggregated progress reported while the batch runs.
//!
//! # Architecture
//!
//! ```text
//! 1. Scan       inputs   →  Vec<SourceEntry>   (files + directories → entries)
//! 2. Compress   entries  →  <name>_compressed.<ext> per entry
//!                           + PipelineEvent stream + RunSummary
//! ```
//!
//! A run is owned by a [`pipeline::PipelineController`]. It moves through
//! `Idle → Running → Completed`, or through `Cancelling` to `Cancelled` when
//! the caller asks it to stop. Per-image failures never abort a run; they are
//! reported as events and counted in the summary.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Expands input paths into the ordered entry list |
//! | [`pipeline`] | Worker pool, result queue, progress aggregation, run state machine |
//! | [`imaging`] | Decode, downscale and encode behind the [`imaging::ImageCodec`] trait |
//! | [`config`] | `recompress.toml` loading, merging onto stock defaults, validation |
//! | [`types`] | Entries, run settings and job records shared across modules |
//! | [`output`] | CLI formatting of scan results and pipeline events |
//!
//! # Design Decisions
//!
//! ## Workers Never Touch Shared Progress
//!
//! A finished job only appends a record to a mutex-guarded queue. A single
//! aggregator drains that queue on a fixed tick and is the sole writer of the
//! run's totals, so there is no contention on progress state and every
//! observer sees the same monotonic sequence of snapshots.
//!
//! ## One Pool Per Run
//!
//! Each run builds its own rayon pool sized to the concurrency ceiling
//! (half the logical CPUs unless configured lower). Jobs are fed one at a time,
//! so at most that many images are decoded in memory at once.
//!
//! ## Libwebp For WebP
//!
//! The `image` crate only writes lossless WebP. Lossy WebP at a tier-derived
//! quality goes through the `webp` crate; JPEG stays in pure Rust.

pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
