//! Shared types passed between the scan stage, the pipeline and the CLI.
//!
//! [`SourceEntry`] and [`PipelineConfig`] are the input contract of a run;
//! [`JobRecord`] is what a worker publishes when a job completes.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Target encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpeg,
    Webp,
}

impl Format {
    /// Lowercase format name, used verbatim as the output file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpeg",
            Format::Webp => "webp",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Format::Jpeg),
            "webp" => Ok(Format::Webp),
            other => Err(format!("unknown format '{other}' (expected jpeg or webp)")),
        }
    }
}

/// Compression-level tier. Mapped to a numeric quality per format by
/// [`QualityTable`](crate::config::QualityTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Low quality, small files.
    Fast,
    Medium,
    /// High quality, larger files.
    Slow,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Fast => "fast",
            Tier::Medium => "medium",
            Tier::Slow => "slow",
        })
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Tier::Fast),
            "medium" => Ok(Tier::Medium),
            "slow" => Ok(Tier::Slow),
            other => Err(format!(
                "unknown tier '{other}' (expected fast, medium or slow)"
            )),
        }
    }
}

/// One image submitted for processing.
///
/// The location never changes. `compressed_size` is attached by the progress
/// aggregator once the entry's job has completed.
#[derive(Debug, Clone, Default)]
pub struct SourceEntry {
    path: PathBuf,
    /// Decoded thumbnail for the display layer. The codec always decodes from disk.
    pub preview: Option<Arc<DynamicImage>>,
    pub original_size: Option<u64>,
    pub compressed_size: Option<u64>,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create an entry with its on-disk size looked up now.
    pub fn from_disk(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let original_size = std::fs::metadata(&path).ok().map(|m| m.len());
        Self {
            path,
            original_size,
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the source and attach a thumbnail bounded by `edge` on both sides.
    /// Sources already within the bound are kept at their own size.
    pub fn load_preview(&mut self, edge: u32) -> image::ImageResult<()> {
        let img = image::ImageReader::open(&self.path)?
            .with_guessed_format()?
            .decode()?;
        let preview = if img.width() > edge || img.height() > edge {
            img.thumbnail(edge, edge)
        } else {
            img
        };
        self.preview = Some(Arc::new(preview));
        Ok(())
    }
}

/// What happens to a source file after its output was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceDisposition {
    #[default]
    Keep,
    Delete,
    /// Relocate the source into this directory.
    MoveTo(PathBuf),
}

/// Immutable snapshot of the run settings, taken when a run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub format: Format,
    pub tier: Tier,
    /// Output directory. `None` writes next to each source.
    pub destination: Option<PathBuf>,
    pub disposition: SourceDisposition,
}

impl PipelineConfig {
    pub fn new(format: Format, tier: Tier) -> Self {
        Self {
            format,
            tier,
            destination: None,
            disposition: SourceDisposition::Keep,
        }
    }

    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = Some(dir.into());
        self
    }

    pub fn with_disposition(mut self, disposition: SourceDisposition) -> Self {
        self.disposition = disposition;
        self
    }
}

/// Terminal outcome of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobOutcome {
    Success,
    LoadFailed,
    EncodeFailed,
    WriteFailed,
}

/// One unit of work, published to the result queue when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Position of the entry in the run's entry list.
    pub index: usize,
    pub output: PathBuf,
    pub bytes: u64,
    pub outcome: JobOutcome,
}
