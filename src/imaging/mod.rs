//! Image decode, downscale and encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (content-sniffed) |
//! | **Downscale** (WebP only) | Lanczos3, bounded by `webp.max_dimension` |
//! | **Encode → JPEG** | `image` JPEG encoder |
//! | **Encode → WebP** | libwebp via the `webp` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing an encode
//! - **Codec**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Operations**: Resolve format/tier against config, then call the codec

mod calculations;
pub mod codec;
pub mod operations;
mod params;
pub mod rust_codec;

pub use calculations::{calculate_downscale, downscale_ratio};
pub use codec::{CodecError, ImageCodec};
pub use operations::{encode, encode_params};
pub use params::{EncodeParams, Quality};
pub use rust_codec::{RustCodec, register_codecs, supported_input_extensions};
