//! Codec and processing configuration.
//!
//! Loaded from an optional `recompress.toml`. User values are merged on top of
//! the stock defaults, unknown keys are rejected, and the merged result is
//! validated before use.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [jpeg.quality]
//! fast = 0.4                # Quality factor per tier, 0.0 (worst) to 1.0 (best)
//! medium = 0.6
//! slow = 0.8
//!
//! [webp]
//! max_dimension = 2048      # Long-edge bound; larger images are downscaled
//!
//! [webp.quality]
//! fast = 0.3
//! medium = 0.7
//! slow = 0.95
//!
//! [processing]
//! max_workers = 4           # Omit for auto = half the logical CPUs
//! tick_interval_ms = 200    # Progress aggregation cadence
//! ```
//!
//! These settings live for the whole process. The per-run choices (format,
//! tier, destination, source disposition) are a separate
//! [`PipelineConfig`](crate::types::PipelineConfig) snapshot.

use crate::imaging::Quality;
use crate::types::{Format, Tier};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub jpeg: JpegConfig,
    pub webp: WebpConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jpeg.quality.validate("jpeg.quality")?;
        self.webp.quality.validate("webp.quality")?;
        if self.webp.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "webp.max_dimension must be non-zero".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        if self.processing.tick_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "processing.tick_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Encoder quality for a format/tier pair.
    pub fn quality_for(&self, format: Format, tier: Tier) -> Quality {
        let table = match format {
            Format::Jpeg => &self.jpeg.quality,
            Format::Webp => &self.webp.quality,
        };
        Quality::from_factor(table.factor(tier))
    }

    /// Long-edge bound applied before encoding, if the format has one.
    pub fn max_dimension_for(&self, format: Format) -> Option<u32> {
        match format {
            Format::Jpeg => None,
            Format::Webp => Some(self.webp.max_dimension),
        }
    }
}

/// Per-tier quality factors in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityTable {
    pub fast: f32,
    pub medium: f32,
    pub slow: f32,
}

impl QualityTable {
    pub fn factor(&self, tier: Tier) -> f32 {
        match tier {
            Tier::Fast => self.fast,
            Tier::Medium => self.medium,
            Tier::Slow => self.slow,
        }
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        for (tier, value) in [("fast", self.fast), ("medium", self.medium), ("slow", self.slow)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{key}.{tier} must be between 0.0 and 1.0"
                )));
            }
        }
        Ok(())
    }
}

/// JPEG settings. Encodes at native resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JpegConfig {
    pub quality: QualityTable,
}

impl Default for JpegConfig {
    fn default() -> Self {
        Self {
            quality: QualityTable {
                fast: 0.4,
                medium: 0.6,
                slow: 0.8,
            },
        }
    }
}

/// WebP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpConfig {
    pub quality: QualityTable,
    /// Neither output dimension exceeds this; aspect ratio is preserved.
    pub max_dimension: u32,
}

impl Default for WebpConfig {
    fn default() -> Self {
        Self {
            quality: QualityTable {
                fast: 0.3,
                medium: 0.7,
                slow: 0.95,
            },
            max_dimension: 2048,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of images encoded at once.
    /// When absent, defaults to half the logical CPUs (at least 1).
    /// Values larger than that are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
    /// How often the progress aggregator drains completed jobs.
    pub tick_interval_ms: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            tick_interval_ms: 200,
        }
    }
}

impl ProcessingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Default concurrency ceiling: half the logical processors, minimum 1.
pub fn default_ceiling() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(1)
}

/// Resolve the effective worker count from config.
///
/// - `None` → [`default_ceiling`]
/// - `Some(n)` → `min(n, default_ceiling())` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let ceiling = default_ceiling();
    config
        .max_workers
        .map(|n| n.clamp(1, ceiling))
        .unwrap_or(ceiling)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock config file. Used by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# recompress configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# JPEG
# ---------------------------------------------------------------------------
# Quality factor used for each compression tier, from 0.0 (smallest file)
# to 1.0 (best quality). JPEG is encoded at the source's native resolution.
[jpeg.quality]
fast = 0.4
medium = 0.6
slow = 0.8

# ---------------------------------------------------------------------------
# WebP
# ---------------------------------------------------------------------------
[webp]
# Images are downscaled (never upscaled) so that neither side exceeds this.
max_dimension = 2048

[webp.quality]
fast = 0.3
medium = 0.7
slow = 0.95

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum images encoded in parallel. Omit to use half the logical CPUs.
# Values above that are clamped down.
# max_workers = 4

# Milliseconds between progress updates.
tick_interval_ms = 200
"##
}
