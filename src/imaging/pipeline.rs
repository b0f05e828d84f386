//! The pixel transform pipeline.
//!
//! A pure function from `(raster, settings)` to a new raster of the same
//! dimensions. Each pixel's RGB channels go through a fixed sequence; alpha
//! is copied through untouched.
//!
//! ```text
//! 1. brightness   c · (1 + b/100)
//! 2. contrast     F · (c − 128) + 128
//! 3. saturation   L + (1 + s/100) · (c − L)      L = luma of step 2 output
//! 4. warmth       r + 20w,  b − 20w               w = warmth/100
//! 5. clamp        round into 0..=255
//! 6. sharpen      base + 0.5 · (k · (base − 127.5) + 127.5 − base)
//!                 k = 1 + sharpness/200, only when sharpness > 0
//! ```
//!
//! Order matters: each step reads the previous step's output. Steps 1–4 run
//! in `f64` without intermediate rounding, exactly one rounding happens at
//! step 5, and a second at step 6 when the overlay is active.
//!
//! Step 6 is a cheap stand-in for an unsharp mask: it boosts global contrast
//! and blends the boosted copy back at half opacity. It is not a convolution.
//!
//! At the all-zero settings vector every step is a no-op, so the output
//! buffer equals the input buffer byte for byte.

use super::calculations::{luminance, to_channel};
use super::params::{Adjustments, CONTRAST_PIVOT, SHARPEN_OPACITY, SHARPEN_PIVOT};
use crate::settings::ImageSettings;
use image::RgbaImage;
use rayon::prelude::*;

/// Run the full pipeline over `source`.
pub fn enhance(source: &RgbaImage, settings: &ImageSettings) -> RgbaImage {
    let adjustments = Adjustments::from_settings(settings);
    let mut output = source.clone();
    let buffer: &mut [u8] = &mut output;

    buffer.par_chunks_exact_mut(4).for_each(|px| {
        let toned = tone([px[0], px[1], px[2]], &adjustments);
        let [r, g, b] = match adjustments.sharpen {
            Some(boost) => toned.map(|c| overlay(c, boost)),
            None => toned,
        };
        px[0] = r;
        px[1] = g;
        px[2] = b;
    });

    tracing::trace!(
        width = output.width(),
        height = output.height(),
        %settings,
        "Enhanced raster"
    );
    output
}

/// Steps 1–5 for one RGB triple.
pub fn tone(rgb: [u8; 3], adj: &Adjustments) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f64);
    let [r, g, b] = brighten([r, g, b], adj.brightness);
    let [r, g, b] = stretch([r, g, b], adj.contrast);
    let [r, g, b] = saturate([r, g, b], adj.saturation);
    let [r, g, b] = warm([r, g, b], adj.warmth);
    [to_channel(r), to_channel(g), to_channel(b)]
}

/// Step 1.
pub fn brighten(rgb: [f64; 3], multiplier: f64) -> [f64; 3] {
    rgb.map(|c| c * multiplier)
}

/// Step 2.
pub fn stretch(rgb: [f64; 3], factor: f64) -> [f64; 3] {
    rgb.map(|c| factor * (c - CONTRAST_PIVOT) + CONTRAST_PIVOT)
}

/// Step 3. Luma comes from the values passed in, i.e. post-contrast.
pub fn saturate(rgb: [f64; 3], multiplier: f64) -> [f64; 3] {
    let [r, g, b] = rgb;
    let gray = luminance(r, g, b);
    rgb.map(|c| gray + multiplier * (c - gray))
}

/// Step 4. Green is left alone.
pub fn warm(rgb: [f64; 3], shift: f64) -> [f64; 3] {
    let [r, g, b] = rgb;
    [r + shift, g, b - shift]
}

/// Step 6 for one already-clamped channel.
pub fn overlay(base: u8, boost: f64) -> u8 {
    let base = base as f64;
    let boosted = (boost * (base - SHARPEN_PIVOT) + SHARPEN_PIVOT).clamp(0.0, 255.0);
    to_channel(base + SHARPEN_OPACITY * (boosted - base))
}
