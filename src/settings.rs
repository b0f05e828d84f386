//! The five-channel adjustment vector.
//!
//! Every enhancement is described by an [`ImageSettings`] value: brightness,
//! contrast, saturation, warmth, and sharpness. All five fields are always
//! present; there is no such thing as a partial vector, and deserialization
//! rejects one.
//!
//! ## Ranges
//!
//! | Channel | Range | Effect |
//! |---|---|---|
//! | brightness | -100..=100 | multiplicative exposure shift |
//! | contrast | -100..=100 | stretch around mid-gray (128) |
//! | saturation | -100..=100 | blend toward/away from luminance |
//! | warmth | -100..=100 | red up / blue down (or the reverse) |
//! | sharpness | 0..=100 | local-contrast overlay |
//!
//! Ranges are enforced at the UI boundary, not here: [`ImageSettings::with_channel`]
//! stores whatever it is given. The pipeline clamps on its own side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Display language for bilingual labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English.
    #[default]
    Primary,
    /// Burmese.
    Secondary,
}

/// A two-locale display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub primary: &'static str,
    pub secondary: &'static str,
}

impl Label {
    pub const fn new(primary: &'static str, secondary: &'static str) -> Self {
        Self { primary, secondary }
    }

    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Primary => self.primary,
            Locale::Secondary => self.secondary,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown channel '{0}' (expected brightness, contrast, saturation, warmth or sharpness)")]
pub struct UnknownChannel(pub String);

/// One adjustment dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Brightness,
    Contrast,
    Saturation,
    Warmth,
    Sharpness,
}

impl Channel {
    /// Slider order in the editor.
    pub const ALL: [Channel; 5] = [
        Channel::Brightness,
        Channel::Contrast,
        Channel::Saturation,
        Channel::Warmth,
        Channel::Sharpness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Brightness => "brightness",
            Channel::Contrast => "contrast",
            Channel::Saturation => "saturation",
            Channel::Warmth => "warmth",
            Channel::Sharpness => "sharpness",
        }
    }

    /// Declared valid range. Sharpness has no negative side.
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            Channel::Sharpness => 0..=100,
            _ => -100..=100,
        }
    }

    pub fn label(self) -> Label {
        match self {
            Channel::Brightness => Label::new("Brightness", "အလင်းရောင်"),
            Channel::Contrast => Label::new("Contrast", "ကွန်ထရာစ်"),
            Channel::Saturation => Label::new("Saturation", "ရောင်စုံမှု"),
            Channel::Warmth => Label::new("Warmth", "နွေးထွေးမှု"),
            Channel::Sharpness => Label::new("Sharpness", "ချွန်ထက်မှု"),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// The full adjustment vector.
///
/// No `Default` impl on purpose: a settings value always comes from a preset
/// or from explicit construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSettings {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub warmth: i32,
    pub sharpness: i32,
}

impl ImageSettings {
    /// The all-zero vector. Every pipeline step is a no-op at this point.
    pub const IDENTITY: ImageSettings = ImageSettings::new(0, 0, 0, 0, 0);

    pub const fn new(
        brightness: i32,
        contrast: i32,
        saturation: i32,
        warmth: i32,
        sharpness: i32,
    ) -> Self {
        Self {
            brightness,
            contrast,
            saturation,
            warmth,
            sharpness,
        }
    }

    pub fn get(&self, channel: Channel) -> i32 {
        match channel {
            Channel::Brightness => self.brightness,
            Channel::Contrast => self.contrast,
            Channel::Saturation => self.saturation,
            Channel::Warmth => self.warmth,
            Channel::Sharpness => self.sharpness,
        }
    }

    /// Copy with one field replaced. Does not clamp.
    pub fn with_channel(self, channel: Channel, value: i32) -> Self {
        let mut next = self;
        match channel {
            Channel::Brightness => next.brightness = value,
            Channel::Contrast => next.contrast = value,
            Channel::Saturation => next.saturation = value,
            Channel::Warmth => next.warmth = value,
            Channel::Sharpness => next.sharpness = value,
        }
        next
    }

    /// Copy with every field forced into its declared range.
    pub fn clamped(self) -> Self {
        Channel::ALL.into_iter().fold(self, |acc, channel| {
            let range = channel.range();
            acc.with_channel(
                channel,
                acc.get(channel).clamp(*range.start(), *range.end()),
            )
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl fmt::Display for ImageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "brightness={} contrast={} saturation={} warmth={} sharpness={}",
            self.brightness, self.contrast, self.saturation, self.warmth, self.sharpness
        )
    }
}
