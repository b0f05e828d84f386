//! Parameter types for the pixel pipeline.
//!
//! These structs describe *what* to do, not *how* to do it. [`Adjustments`]
//! is the bridge between the integer [`ImageSettings`] a caller edits and
//! the floating-point factors the per-pixel loop consumes. Deriving them once
//! per run keeps the inner loop free of divisions.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 92). Clamped on construction.
//! - [`Adjustments`]: Per-run multipliers and offsets derived from clamped settings.

use super::calculations::contrast_factor;
use crate::settings::ImageSettings;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    /// Matches a browser `toDataURL("image/jpeg", 0.92)` preview.
    fn default() -> Self {
        Self(92)
    }
}

/// Opacity of the sharpen overlay.
pub const SHARPEN_OPACITY: f64 = 0.5;

/// Pivot of the sharpen overlay's contrast boost (CSS `contrast()` semantics).
pub const SHARPEN_PIVOT: f64 = 127.5;

/// Pivot of the main contrast stretch.
pub const CONTRAST_PIVOT: f64 = 128.0;

/// Red/blue shift at full warmth.
pub const WARMTH_SHIFT: f64 = 20.0;

/// Factors for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    /// Added to red, subtracted from blue.
    pub warmth: f64,
    /// Contrast boost for the overlay, `None` when sharpness is zero.
    pub sharpen: Option<f64>,
}

impl Adjustments {
    /// Derive factors from `settings`, clamping each channel into its range first.
    pub fn from_settings(settings: &ImageSettings) -> Self {
        let s = settings.clamped();
        Self {
            brightness: 1.0 + s.brightness as f64 / 100.0,
            contrast: contrast_factor(s.contrast as f64),
            saturation: 1.0 + s.saturation as f64 / 100.0,
            warmth: WARMTH_SHIFT * (s.warmth as f64 / 100.0),
            sharpen: (s.sharpness > 0).then(|| 1.0 + s.sharpness as f64 / 200.0),
        }
    }
}
