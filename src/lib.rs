//! # Image Enhancer
//!
//! Interactive photo enhancement for product and marketing images. A source
//! image is adjusted along five channels (brightness, contrast, saturation,
//! warmth, sharpness), either one slider at a time or through named presets,
//! and the result is re-rendered in the background as a JPEG preview.
//!
//! # Architecture
//!
//! ```text
//!   SourceRef ──load──▶ bytes ──decode (once)──▶ RGBA raster
//!                                                     │
//!   ImageSettings ──────────────────────────▶ enhance (rayon, per pixel)
//!        ▲                                            │
//!        │                                       encode JPEG q92
//!   update_channel / apply_preset                     │
//!        │                                            ▼
//!     Engine ◀───────── sequenced result ───── Preview::Enhanced
//!        │
//!   PreviewCoordinator ──▶ displayed(), compare hold, labels, on_enhanced
//! ```
//!
//! Mutations return immediately. Each one starts a background run; runs are
//! never cancelled, and a sequence number decides which result is kept.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | The five-channel settings vector, channel ranges and labels |
//! | [`presets`] | The closed set of named presets and the registry that serves them |
//! | [`imaging`] | Pure-Rust pixel pipeline, decode, JPEG encode, data URIs |
//! | [`source`] | Source locators (path, URL, data URI) and the async loader seam |
//! | [`engine`] | Current settings, derived preview, asynchronous recompute |
//! | [`preview`] | Compare hold, active preset, slider and preset-bar data |
//! | [`batch`] | Apply one settings vector to a whole directory tree |
//! | [`cache`] | Content-addressed manifest making batch re-runs incremental |
//! | [`config`] | `enhancer.toml` loading, merging, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Last Invocation Wins
//!
//! The browser editor this grew out of let whichever render finished last
//! overwrite the preview, so a slow early render could replace a fast late
//! one. [`engine::Engine`] numbers every request and only stores the newest
//! by default. The old behavior is still selectable as
//! [`engine::RecomputePolicy::LastCompletion`].
//!
//! ## Clamp Before Math
//!
//! Channel values are stored exactly as given, but the pipeline clamps them
//! to their declared ranges before deriving factors. Out-of-range input is
//! therefore harmless, and the contrast formula never reaches its pole at 259.
//!
//! ## Original Means Original
//!
//! Reset and decode failures show the caller's own source reference, not a
//! re-encoded copy. JPEG is lossy; "original" should be byte-exact.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding go through the `image` crate with no system
//! libraries, so the binary runs anywhere without an ImageMagick install.

pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod imaging;
pub mod output;
pub mod presets;
pub mod preview;
pub mod settings;
pub mod source;
