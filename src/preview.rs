//! Preview coordination: which image a viewer shows, and the UI-facing data
//! around an [`Engine`].
//!
//! The coordinator adds three things on top of the engine:
//!
//! - **Compare hold.** While held, [`displayed`](PreviewCoordinator::displayed)
//!   returns the original even if a processed preview exists. Releasing it
//!   restores the processed preview without recomputing.
//! - **Presentation data.** Bilingual labels, slider descriptors, and the
//!   quick-preset row with the active preset highlighted. A preset is active
//!   only when every channel matches exactly.
//! - **Change notification.** [`on_enhanced`](PreviewCoordinator::on_enhanced)
//!   runs a callback with the new preview source each time one is stored.

use crate::engine::{Engine, Preview, Recompute, Snapshot};
use crate::presets::PresetName;
use crate::settings::{Channel, ImageSettings, Locale};
use crate::source::SourceRef;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::task::JoinHandle;

/// One adjustment slider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliderSpec {
    pub channel: Channel,
    pub label: &'static str,
    pub min: i32,
    pub max: i32,
    pub value: i32,
}

impl SliderSpec {
    pub fn range(&self) -> RangeInclusive<i32> {
        self.min..=self.max
    }
}

/// One quick-preset button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetButton {
    pub name: PresetName,
    pub label: &'static str,
    pub active: bool,
}

pub struct PreviewCoordinator {
    engine: Engine,
    /// Set by `press_compare`, cleared by `release_compare`.
    pressed: AtomicBool,
    /// Live [`CompareHold`] guards.
    holds: AtomicUsize,
}

/// Keeps compare mode on until dropped. Holds nest: compare stays on while
/// any of them is alive.
#[must_use = "compare mode ends when the hold is dropped"]
pub struct CompareHold<'a> {
    coordinator: &'a PreviewCoordinator,
}

impl Drop for CompareHold<'_> {
    fn drop(&mut self) {
        self.coordinator.holds.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PreviewCoordinator {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            pressed: AtomicBool::new(false),
            holds: AtomicUsize::new(0),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    pub fn update_channel(&self, channel: Channel, value: i32) -> Recompute {
        self.engine.update_channel(channel, value)
    }

    pub fn apply_preset(&self, name: PresetName) -> Recompute {
        self.engine.apply_preset(name)
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn set_source(&self, source: SourceRef) -> Option<Recompute> {
        self.engine.set_source(source)
    }

    pub fn settings(&self) -> ImageSettings {
        self.engine.settings()
    }

    pub fn is_processing(&self) -> bool {
        self.engine.is_processing()
    }

    /// Show the original until [`release_compare`](Self::release_compare).
    pub fn press_compare(&self) {
        self.pressed.store(true, Ordering::Release);
    }

    pub fn release_compare(&self) {
        self.pressed.store(false, Ordering::Release);
    }

    /// Show the original for as long as the returned guard lives.
    pub fn hold_compare(&self) -> CompareHold<'_> {
        self.holds.fetch_add(1, Ordering::AcqRel);
        CompareHold { coordinator: self }
    }

    pub fn is_comparing(&self) -> bool {
        self.pressed.load(Ordering::Acquire) || self.holds.load(Ordering::Acquire) > 0
    }

    /// What a viewer should render right now.
    pub fn displayed(&self) -> Preview {
        if self.is_comparing() {
            Preview::Original(self.engine.original())
        } else {
            self.engine.processed()
        }
    }

    /// The preset whose vector equals the current settings exactly.
    pub fn active_preset(&self) -> Option<PresetName> {
        self.engine.registry().matching(&self.engine.settings())
    }

    pub fn preset_label(&self, name: PresetName, locale: Locale) -> &'static str {
        self.engine.registry().label(name, locale)
    }

    pub fn channel_label(&self, channel: Channel, locale: Locale) -> &'static str {
        channel.label().get(locale)
    }

    pub fn sliders(&self, locale: Locale) -> Vec<SliderSpec> {
        let settings = self.engine.settings();
        Channel::ALL
            .iter()
            .map(|&channel| {
                let range = channel.range();
                SliderSpec {
                    channel,
                    label: channel.label().get(locale),
                    min: *range.start(),
                    max: *range.end(),
                    value: settings.get(channel),
                }
            })
            .collect()
    }

    /// Every preset except `original`, in registry order.
    pub fn quick_presets(&self, locale: Locale) -> Vec<PresetButton> {
        let settings = self.engine.settings();
        self.engine
            .registry()
            .quick_presets()
            .map(|preset| PresetButton {
                name: preset.name,
                label: preset.label.get(locale),
                active: preset.settings == settings,
            })
            .collect()
    }

    /// Call `callback` with the preview source after every newly stored
    /// preview, including the fallback to the original and a reset.
    ///
    /// The task ends when the engine is dropped or the handle is aborted.
    pub fn on_enhanced<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(String) + Send + 'static,
    {
        let mut updates = self.engine.subscribe();
        let mut seen = updates.borrow_and_update().revision;
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot: Snapshot = updates.borrow_and_update().clone();
                if snapshot.revision != seen {
                    seen = snapshot.revision;
                    callback(snapshot.processed.src());
                }
            }
        })
    }
}
