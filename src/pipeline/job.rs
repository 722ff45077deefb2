//! Execution of a single job: name the output, encode, write, dispose of the
//! source, publish the record.

use super::events::{ErrorKind, ItemError, PipelineEvent, emit};
use super::lock;
use super::queue::JobResultQueue;
use crate::config::Config;
use crate::imaging::{self, CodecError, ImageCodec};
use crate::types::{Format, JobOutcome, JobRecord, PipelineConfig, SourceDisposition};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Suffix appended to the source's base name.
pub const OUTPUT_SUFFIX: &str = "_compressed";

/// Output paths already taken in the current run, keyed to the entry that
/// took them.
///
/// Two sources with the same stem (`a/photo.png` and `b/photo.png` into one
/// destination, or `x.png` next to `x.jpg`) resolve to the same output. The
/// first entry to claim it writes; later ones fail with `WriteFailed`.
#[derive(Debug, Default)]
pub struct OutputClaims {
    claimed: Mutex<HashMap<PathBuf, usize>>,
}

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` for entry `index`. Returns the current owner when it is
    /// already taken by another entry.
    pub fn claim(&self, path: &Path, index: usize) -> Result<(), usize> {
        let mut claimed = lock(&self.claimed);
        match claimed.get(path) {
            Some(&owner) if owner != index => Err(owner),
            Some(_) => Ok(()),
            None => {
                claimed.insert(path.to_path_buf(), index);
                Ok(())
            }
        }
    }

    /// Give `path` back after a failed write so nothing is left reserved for
    /// a file that was never produced.
    pub fn release(&self, path: &Path, index: usize) {
        let mut claimed = lock(&self.claimed);
        if claimed.get(path) == Some(&index) {
            claimed.remove(path);
        }
    }
}

/// Everything a worker needs, shared read-only across the pool.
pub struct JobContext {
    pub codec: Arc<dyn ImageCodec>,
    pub codec_config: Arc<Config>,
    pub run: PipelineConfig,
    pub queue: Arc<JobResultQueue>,
    pub claims: OutputClaims,
    pub events: Option<Sender<PipelineEvent>>,
}

impl JobContext {
    fn report(&self, error: ItemError) {
        warn!(index = error.index, kind = ?error.kind, "{error}");
        emit(self.events.as_ref(), PipelineEvent::ItemFailed(error));
    }
}

/// Output location for entry `index`:
/// `<destination or source dir>/<base name>_compressed.<ext>`.
///
/// When the base name cannot be determined (e.g. the source is gone) the name
/// falls back to `image-<index>`.
pub fn resolve_output_path(
    source: &Path,
    index: usize,
    format: Format,
    destination: Option<&Path>,
) -> PathBuf {
    let dir = match destination {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let base = source
        .exists()
        .then(|| source.file_stem())
        .flatten()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("image-{index}"));
    dir.join(format!("{base}{OUTPUT_SUFFIX}.{}", format.extension()))
}

fn write_output(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

/// Relocate `source` into `dir` without ever replacing an existing file.
fn move_into(source: &Path, dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
    let target = dir.join(name);
    if target.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }
    // A hard link fails atomically if another worker created the target first
    match fs::hard_link(source, &target) {
        Ok(()) => return fs::remove_file(source),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Err(err),
        Err(_) => {}
    }
    // Links are unavailable across filesystems
    let mut from = fs::File::open(source)?;
    let mut to = OpenOptions::new().write(true).create_new(true).open(&target)?;
    if let Err(err) = io::copy(&mut from, &mut to) {
        drop(to);
        let _ = fs::remove_file(&target);
        return Err(err);
    }
    fs::remove_file(source)
}

/// Delete or relocate the source after its output was written.
fn dispose_source(source: &Path, disposition: &SourceDisposition) -> io::Result<()> {
    match disposition {
        SourceDisposition::Keep => Ok(()),
        SourceDisposition::Delete => fs::remove_file(source),
        SourceDisposition::MoveTo(dir) => move_into(source, dir),
    }
}

/// Run one job to its terminal state. Only successes reach the queue; every
/// failure is reported on the event channel right away.
pub fn run_job(ctx: &JobContext, index: usize, source: &Path) -> JobOutcome {
    let format = ctx.run.format;
    let output = resolve_output_path(source, index, format, ctx.run.destination.as_deref());
    debug!(index, source = %source.display(), output = %output.display(), "job started");

    let bytes = match imaging::encode(&*ctx.codec, source, format, ctx.run.tier, &ctx.codec_config)
    {
        Ok(bytes) => bytes,
        Err(err) => {
            let (kind, outcome) = match err {
                CodecError::LoadFailed { .. } => (ErrorKind::LoadFailed, JobOutcome::LoadFailed),
                CodecError::EncodeFailed { .. } => {
                    (ErrorKind::EncodeFailed, JobOutcome::EncodeFailed)
                }
            };
            ctx.report(ItemError::new(index, source, kind, err));
            return outcome;
        }
    };

    if let Err(owner) = ctx.claims.claim(&output, index) {
        let detail = format!(
            "{} collides with the output of entry {owner}",
            output.display()
        );
        ctx.report(ItemError::new(index, source, ErrorKind::WriteFailed, detail));
        return JobOutcome::WriteFailed;
    }

    if let Err(err) = write_output(&output, &bytes) {
        ctx.claims.release(&output, index);
        ctx.report(ItemError::new(index, source, ErrorKind::WriteFailed, err));
        return JobOutcome::WriteFailed;
    }

    if let Err(err) = dispose_source(source, &ctx.run.disposition) {
        ctx.report(ItemError::new(index, source, ErrorKind::DeleteFailed, err));
    }

    let size = bytes.len() as u64;
    debug!(index, bytes = size, "job finished");
    ctx.queue.push(JobRecord {
        index,
        output,
        bytes: size,
        outcome: JobOutcome::Success,
    });
    JobOutcome::Success
}
