//! Pure calculation functions for pixel math and dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Rec. 601 luma weights used for the saturation blend.
///
/// They sum to 0.9999, not 1.0. Kept as-is so output matches the browser
/// editor this engine replaced.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.587, 0.114];

/// Classic contrast correction factor.
///
/// `F = 259·(c + 255) / (255·(259 − c))`. Equals exactly 1.0 at `c = 0`.
/// Undefined at `c = 259`; callers clamp `c` to -100..=100 first.
///
/// # Examples
/// ```
/// # use image_enhancer::imaging::contrast_factor;
/// assert_eq!(contrast_factor(0.0), 1.0);
/// assert!(contrast_factor(50.0) > 1.0);
/// assert!(contrast_factor(-50.0) < 1.0);
/// ```
pub fn contrast_factor(contrast: f64) -> f64 {
    (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast))
}

/// Weighted luminance of an RGB triple.
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Round to nearest and saturate into a channel byte.
///
/// NaN maps to 0 (Rust's saturating float-to-int cast).
pub fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}

/// Mean luminance of an RGBA8 buffer (alpha ignored). Zero for an empty buffer.
pub fn mean_luminance(rgba: &[u8]) -> f64 {
    let pixels = rgba.len() / 4;
    if pixels == 0 {
        return 0.0;
    }
    let total: f64 = rgba
        .chunks_exact(4)
        .map(|px| luminance(px[0] as f64, px[1] as f64, px[2] as f64))
        .sum();
    total / pixels as f64
}

/// Coarse shape of an image, used to pick a layout in galleries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

/// Classify by aspect ratio with a ±10% band for "square".
///
/// # Examples
/// ```
/// # use image_enhancer::imaging::{detect_orientation, Orientation};
/// assert_eq!(detect_orientation(1200, 800), Orientation::Landscape);
/// assert_eq!(detect_orientation(800, 1200), Orientation::Portrait);
/// assert_eq!(detect_orientation(1000, 950), Orientation::Square);
/// ```
pub fn detect_orientation(width: u32, height: u32) -> Orientation {
    let ratio = width as f64 / height as f64;
    if ratio > 1.1 {
        Orientation::Landscape
    } else if ratio < 0.9 {
        Orientation::Portrait
    } else {
        Orientation::Square
    }
}

/// Default bounding box for web previews.
pub const DEFAULT_MAX_EDGE: u32 = 800;

/// Fit `(width, height)` inside `(max_width, max_height)`, keeping aspect ratio.
///
/// Images that already fit are returned unchanged. Only the longer edge is
/// checked against its own bound, then the other edge follows the ratio.
///
/// # Returns
/// * `(width, height)` - Fitted dimensions, rounded to whole pixels
pub fn optimal_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let aspect = width as f64 / height as f64;

    if width > height {
        let w = width.min(max_width);
        (w, (w as f64 / aspect).round() as u32)
    } else {
        let h = height.min(max_height);
        ((h as f64 * aspect).round() as u32, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contrast_factor_is_one_at_zero() {
        assert_eq!(contrast_factor(0.0), 1.0);
    }

    #[test]
    fn contrast_factor_at_range_edges() {
        // 259·355 / (255·159)
        assert!((contrast_factor(100.0) - 2.267_727).abs() < 1e-5);
        // 259·155 / (255·359)
        assert!((contrast_factor(-100.0) - 0.438_528).abs() < 1e-5);
    }

    #[test]
    fn luminance_of_gray_is_slightly_under_value() {
        let l = luminance(128.0, 128.0, 128.0);
        assert!((l - 127.9872).abs() < 1e-9);
    }

    #[test]
    fn to_channel_rounds_and_saturates() {
        assert_eq!(to_channel(127.5), 128);
        assert_eq!(to_channel(127.49), 127);
        assert_eq!(to_channel(-12.0), 0);
        assert_eq!(to_channel(300.0), 255);
        assert_eq!(to_channel(f64::NAN), 0);
    }

    #[test]
    fn mean_luminance_empty_is_zero() {
        assert_eq!(mean_luminance(&[]), 0.0);
    }

    #[test]
    fn mean_luminance_ignores_alpha() {
        let opaque = [100, 100, 100, 255, 200, 200, 200, 255];
        let clear = [100, 100, 100, 0, 200, 200, 200, 0];
        assert_eq!(mean_luminance(&opaque), mean_luminance(&clear));
    }

    #[test]
    fn orientation_band_edges() {
        assert_eq!(detect_orientation(110, 100), Orientation::Square);
        assert_eq!(detect_orientation(111, 100), Orientation::Landscape);
        assert_eq!(detect_orientation(90, 100), Orientation::Square);
        assert_eq!(detect_orientation(89, 100), Orientation::Portrait);
    }

    #[test]
    fn optimal_dimensions_small_image_unchanged() {
        assert_eq!(optimal_dimensions(640, 480, 800, 800), (640, 480));
    }

    #[test]
    fn optimal_dimensions_landscape() {
        assert_eq!(optimal_dimensions(1600, 1200, 800, 800), (800, 600));
    }

    #[test]
    fn optimal_dimensions_portrait() {
        assert_eq!(optimal_dimensions(1000, 2000, 800, 800), (400, 800));
    }
}
