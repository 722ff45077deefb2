//! High-level image operations.
//!
//! These resolve a format/tier pair against the [`Config`] tables and hand
//! the resulting [`EncodeParams`] to a codec.

use super::codec::{CodecError, ImageCodec};
use super::params::EncodeParams;
use crate::config::Config;
use crate::types::{Format, Tier};
use std::path::Path;

/// Build the encode parameters for one source.
pub fn encode_params(source: &Path, format: Format, tier: Tier, config: &Config) -> EncodeParams {
    EncodeParams {
        source: source.to_path_buf(),
        format,
        quality: config.quality_for(format, tier),
        max_dimension: config.max_dimension_for(format),
    }
}

/// Encode `source` into `format` at the quality mapped from `tier`.
pub fn encode(
    codec: &(impl ImageCodec + ?Sized),
    source: &Path,
    format: Format,
    tier: Tier,
    config: &Config,
) -> Result<Vec<u8>, CodecError> {
    codec.encode(&encode_params(source, format, tier, config))
}
