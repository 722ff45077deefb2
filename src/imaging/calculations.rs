//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale factor that fits `(width, height)` inside a `max_dim` square.
///
/// `min(max_dim / width, max_dim / height, 1.0)`, so it never upscales.
pub fn downscale_ratio(dims: (u32, u32), max_dim: u32) -> f64 {
    let (w, h) = dims;
    if w == 0 || h == 0 {
        return 1.0;
    }
    let max = max_dim as f64;
    (max / w as f64).min(max / h as f64).min(1.0)
}

/// Calculate output dimensions bounded by `max_dim` on both edges.
///
/// Aspect ratio is preserved within rounding. Neither edge grows, and neither
/// collapses to zero.
///
/// # Examples
/// ```
/// # use recompress::imaging::calculate_downscale;
/// assert_eq!(calculate_downscale((4096, 2048), 2048), (2048, 1024));
/// assert_eq!(calculate_downscale((800, 600), 2048), (800, 600));
/// ```
pub fn calculate_downscale(dims: (u32, u32), max_dim: u32) -> (u32, u32) {
    let ratio = downscale_ratio(dims, max_dim);
    if ratio >= 1.0 {
        return dims;
    }
    let (w, h) = dims;
    let scale = |edge: u32| ((edge as f64 * ratio).round() as u32).clamp(1, max_dim.max(1));
    (scale(w), scale(h))
}
