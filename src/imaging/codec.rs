//! Codec trait and shared error type.
//!
//! The [`ImageCodec`] trait is the seam between the pipeline and the pixel
//! work. The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec); tests use a recording mock.
//!
//! Implementations are called from several workers at once and must not keep
//! shared mutable state between calls.

use super::params::EncodeParams;
use crate::types::Format;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Source missing, unreadable, or not a decodable image.
    #[error("could not load {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },
    #[error("could not encode {} as {format}: {reason}", path.display())]
    EncodeFailed {
        path: PathBuf,
        format: Format,
        reason: String,
    },
}

impl CodecError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        CodecError::LoadFailed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(path: &Path, format: Format, reason: impl ToString) -> Self {
        CodecError::EncodeFailed {
            path: path.to_path_buf(),
            format,
            reason: reason.to_string(),
        }
    }
}

/// Decode a source image and re-encode it. Returns the encoded bytes; never
/// writes to disk.
pub trait ImageCodec: Send + Sync {
    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, CodecError>;
}
