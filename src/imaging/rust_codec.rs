//! Production codec built on the `image` crate and libwebp.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with content sniffing |
//! | Downscale | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → WebP (lossy) | `webp::Encoder` |
//!
//! Every call decodes into its own buffers, so one [`RustCodec`] is shared by
//! all workers without locking.

use super::calculations::calculate_downscale;
use super::codec::{CodecError, ImageCodec};
use super::params::{EncodeParams, Quality};
use crate::types::Format;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::Path;
use std::sync::LazyLock;

/// Input extensions we expect a decoder for.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Probe the compiled-in decoders. Called once at startup, before any run.
pub fn register_codecs() -> &'static [&'static str] {
    LazyLock::force(&SUPPORTED_EXTENSIONS).as_slice()
}

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure-Rust decode, JPEG via `image`, WebP via libwebp.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

/// Load and decode an image from disk, sniffing the format from its content.
fn load_image(path: &Path) -> Result<DynamicImage, CodecError> {
    ImageReader::open(path)
        .map_err(|e| CodecError::load(path, e))?
        .with_guessed_format()
        .map_err(|e| CodecError::load(path, e))?
        .decode()
        .map_err(|e| CodecError::load(path, e))
}

/// Shrink so neither edge exceeds `max_dim`. Returns the input when it already fits.
fn downscale(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let dims = img.dimensions();
    let (w, h) = calculate_downscale(dims, max_dim);
    if (w, h) == dims {
        img
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(buf)
}

fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, String> {
    let (w, h) = img.dimensions();
    let q = quality.value() as f32;
    let encoded = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        webp::Encoder::from_rgba(rgba.as_raw(), w, h).encode_simple(false, q)
    } else {
        let rgb = img.to_rgb8();
        webp::Encoder::from_rgb(rgb.as_raw(), w, h).encode_simple(false, q)
    };
    encoded
        .map(|mem| mem.to_vec())
        .map_err(|e| format!("libwebp error: {e:?}"))
}

impl ImageCodec for RustCodec {
    fn encode(&self, params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        let img = load_image(&params.source)?;
        let img = match params.max_dimension {
            Some(max_dim) => downscale(img, max_dim),
            None => img,
        };

        match params.format {
            Format::Jpeg => encode_jpeg(&img, params.quality)
                .map_err(|e| CodecError::encode(&params.source, params.format, e)),
            Format::Webp => encode_webp(&img, params.quality)
                .map_err(|e| CodecError::encode(&params.source, params.format, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_test_jpeg, write_test_png};
    use tempfile::TempDir;

    fn params(source: &Path, format: Format, max_dimension: Option<u32>) -> EncodeParams {
        EncodeParams {
            source: source.to_path_buf(),
            format,
            quality: Quality::new(70),
            max_dimension,
        }
    }

    #[test]
    fn supported_extensions_include_common_photo_formats() {
        let exts = register_codecs();
        for ext in ["jpg", "jpeg", "png", "webp"] {
            assert!(exts.contains(&ext), "missing {ext}");
        }
        assert_eq!(exts, supported_input_extensions());
    }

    #[test]
    fn encodes_jpeg_at_native_resolution() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        write_test_png(&source, 320, 200);

        let bytes = RustCodec::new()
            .encode(&params(&source, Format::Jpeg, None))
            .unwrap();

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (320, 200));
    }

    #[test]
    fn encodes_webp_with_downscale() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("wide.jpg");
        write_test_jpeg(&source, 400, 100);

        let bytes = RustCodec::new()
            .encode(&params(&source, Format::Webp, Some(200)))
            .unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (200, 50));
    }

    #[test]
    fn webp_never_upscales() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("small.png");
        write_test_png(&source, 64, 48);

        let bytes = RustCodec::new()
            .encode(&params(&source, Format::Webp, Some(2048)))
            .unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn lower_quality_produces_smaller_jpeg() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.png");
        write_test_png(&source, 256, 256);

        let codec = RustCodec::new();
        let mut low = params(&source, Format::Jpeg, None);
        low.quality = Quality::new(10);
        let mut high = params(&source, Format::Jpeg, None);
        high.quality = Quality::new(95);

        let low_bytes = codec.encode(&low).unwrap();
        let high_bytes = codec.encode(&high).unwrap();
        assert!(low_bytes.len() < high_bytes.len());
    }

    #[test]
    fn missing_source_is_load_failed() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("gone.jpg");

        let err = RustCodec::new()
            .encode(&params(&source, Format::Jpeg, None))
            .unwrap_err();
        assert!(matches!(err, CodecError::LoadFailed { path, .. } if path == source));
    }

    #[test]
    fn corrupt_source_is_load_failed() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let err = RustCodec::new()
            .encode(&params(&source, Format::Webp, Some(2048)))
            .unwrap_err();
        assert!(matches!(err, CodecError::LoadFailed { .. }));
    }
}
