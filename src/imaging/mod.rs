//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Enhance** | [`enhance`], per-pixel with `rayon` |
//! | **Encode** | JPEG at quality 92 + base64 `data:` URI |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for pixel and dimension math (unit testable)
//! - **Parameters**: [`Quality`] and the per-run [`Adjustments`]
//! - **Pipeline**: the ordered brightness → contrast → saturation → warmth → clamp → sharpen transform
//! - **Codec**: decode / encode / data URI

mod calculations;
pub mod codec;
mod params;
pub mod pipeline;

pub use calculations::{
    DEFAULT_MAX_EDGE, Orientation, contrast_factor, detect_orientation, luminance,
    mean_luminance, optimal_dimensions,
};
pub use codec::{CodecError, EncodedImage, decode, encode_jpeg};
pub use params::{Adjustments, Quality};
pub use pipeline::enhance;
