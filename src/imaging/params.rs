//! Parameter types for encode operations.
//!
//! These structs describe *what* to encode, not *how*. They are the interface
//! between [`operations`](super::operations), which resolves a format/tier pair
//! against the configuration, and the [`codec`](super::codec), which does the
//! pixel work.

use crate::types::Format;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Convert a `0.0..=1.0` compression factor into a percentage quality.
    pub fn from_factor(factor: f32) -> Self {
        Self::new((factor.clamp(0.0, 1.0) * 100.0).round() as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Full specification for a single encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub format: Format,
    pub quality: Quality,
    /// Long-edge bound applied before encoding. `None` keeps native resolution.
    pub max_dimension: Option<u32>,
}
