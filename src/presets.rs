//! Named presets and the registry that serves them.
//!
//! The preset set is closed and compiled in: [`PresetName`] is an enum, so a
//! lookup by name cannot miss at runtime with the standard registry. A
//! registry built without one of the names (a test fake, say) panics on
//! lookup. That is a wiring bug, not a condition to recover from.
//!
//! Strings only show up at the edges (CLI flags, config files), where
//! [`PresetName::from_str`] returns a typed [`UnknownPreset`] error.

use crate::settings::{ImageSettings, Label, Locale};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown preset '{0}'")]
pub struct UnknownPreset(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresetName {
    Original,
    AdReady,
    CleanWeb,
    Cinematic,
    Product,
    Lifestyle,
}

impl PresetName {
    /// Declaration order. Also the tie-break order for [`PresetRegistry::matching`].
    pub const ALL: [PresetName; 6] = [
        PresetName::Original,
        PresetName::AdReady,
        PresetName::CleanWeb,
        PresetName::Cinematic,
        PresetName::Product,
        PresetName::Lifestyle,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PresetName::Original => "original",
            PresetName::AdReady => "adReady",
            PresetName::CleanWeb => "cleanWeb",
            PresetName::Cinematic => "cinematic",
            PresetName::Product => "product",
            PresetName::Lifestyle => "lifestyle",
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PresetName {
    type Err = UnknownPreset;

    /// Accepts `adReady`, `ad-ready`, `ad_ready`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        PresetName::ALL
            .into_iter()
            .find(|name| name.key().to_ascii_lowercase() == folded)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// An immutable named settings vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: PresetName,
    pub settings: ImageSettings,
    pub label: Label,
}

const STANDARD_PRESETS: [Preset; 6] = [
    Preset {
        name: PresetName::Original,
        settings: ImageSettings::IDENTITY,
        label: Label::new("Original", "မူရင်း"),
    },
    Preset {
        name: PresetName::AdReady,
        settings: ImageSettings::new(10, 20, 25, 5, 30),
        label: Label::new("Ad Ready", "ကြော်ငြာအဆင်သင့်"),
    },
    Preset {
        name: PresetName::CleanWeb,
        settings: ImageSettings::new(5, 10, 10, 0, 15),
        label: Label::new("Clean Web", "ဝဘ်ဆိုက်သန့်"),
    },
    Preset {
        name: PresetName::Cinematic,
        settings: ImageSettings::new(-5, 25, -10, 15, 20),
        label: Label::new("Cinematic", "ရုပ်ရှင်ပုံစံ"),
    },
    Preset {
        name: PresetName::Product,
        settings: ImageSettings::new(15, 15, 20, -5, 40),
        label: Label::new("Product", "ပစ္စည်း"),
    },
    Preset {
        name: PresetName::Lifestyle,
        settings: ImageSettings::new(8, 10, 15, 20, 10),
        label: Label::new("Lifestyle", "လိုက်ဖ်စတိုင်"),
    },
];

static STANDARD: LazyLock<Arc<PresetRegistry>> =
    LazyLock::new(|| Arc::new(PresetRegistry::new(STANDARD_PRESETS.to_vec())));

/// Read-only table of presets, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    pub fn new(presets: Vec<Preset>) -> Self {
        Self { presets }
    }

    /// The built-in table.
    pub fn standard() -> Arc<PresetRegistry> {
        Arc::clone(&STANDARD)
    }

    /// # Panics
    ///
    /// If this registry was built without `name`.
    pub fn get(&self, name: PresetName) -> &Preset {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("preset '{name}' is not registered"))
    }

    /// The settings vector for `name`. Panics like [`get`](Self::get).
    pub fn lookup(&self, name: PresetName) -> ImageSettings {
        self.get(name).settings
    }

    pub fn label(&self, name: PresetName, locale: Locale) -> &'static str {
        self.get(name).label.get(locale)
    }

    /// First preset whose vector equals `settings` field for field.
    pub fn matching(&self, settings: &ImageSettings) -> Option<PresetName> {
        self.presets
            .iter()
            .find(|p| p.settings == *settings)
            .map(|p| p.name)
    }

    pub fn is_active(&self, name: PresetName, settings: &ImageSettings) -> bool {
        self.lookup(name) == *settings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    /// Everything except `original`, which the editor exposes as "reset".
    pub fn quick_presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets
            .iter()
            .filter(|p| p.name != PresetName::Original)
    }
}
