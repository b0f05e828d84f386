//! Decoding source bytes into a raster and encoding previews.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` → RGBA8 |
//! | Encode preview | `image::codecs::jpeg::JpegEncoder` at [`Quality`] |
//! | Data URI | `base64` standard alphabet |
//!
//! JPEG has no alpha channel, so encoding composites over black first, the
//! way a canvas export does. Previews are lossy:
//! decoding an encoded preview does not give back the raster that went in,
//! even at the identity settings. Compare raw rasters, not encoded bytes.

use super::params::Quality;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, ImageFormat, Rgb, RgbImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode preview: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Image has zero width or height")]
    Empty,
}

/// Extensions with decoders compiled in.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(ext))
}

/// Decode any supported format into RGBA8.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let image = image::load_from_memory(bytes).map_err(CodecError::Decode)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(CodecError::Empty);
    }
    Ok(image.into_rgba8())
}

/// Sniff the container format, if the `image` crate recognizes it.
pub fn guess_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// An encoded preview, ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub const MIME: &'static str = "image/jpeg";

    /// Self-contained `data:` URI usable directly as an image source.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", Self::MIME, STANDARD.encode(&self.bytes))
    }
}

/// Composite over opaque black. Fully transparent pixels become black.
pub fn flatten_on_black(raster: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, a] = raster.get_pixel(x, y).0;
        let scale = |c: u8| ((c as u32 * a as u32 + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

/// Encode `raster` as JPEG at `quality`, flattening alpha over black.
pub fn encode_jpeg(raster: &RgbaImage, quality: Quality) -> Result<EncodedImage, CodecError> {
    let rgb = flatten_on_black(raster);
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.value())
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(CodecError::Encode)?;
    Ok(EncodedImage {
        bytes,
        width: raster.width(),
        height: raster.height(),
    })
}
