//! The recompute engine: current settings, derived preview, live updates.
//!
//! An [`Engine`] owns one source image and the settings applied to it. Every
//! mutation ([`update_channel`](Engine::update_channel),
//! [`apply_preset`](Engine::apply_preset), [`set_source`](Engine::set_source))
//! replaces the settings immediately and starts an asynchronous recompute.
//! The caller is never blocked; it gets a [`Recompute`] handle it may await
//! or drop.
//!
//! # States
//!
//! ```text
//!            update_channel / apply_preset / set_source
//!   Idle ──────────────────────────────────────────────▶ Processing
//!    ▲                                                      │
//!    └────────────── last pending run finishes ─────────────┘
//!
//!   reset(): any state ──▶ Idle, settings = original, preview = source
//! ```
//!
//! # Decoding
//!
//! The source is decoded at most once per [`set_source`]. All runs for that
//! source share the raster through a `tokio::sync::OnceCell`; a run started
//! before decoding finishes simply waits on the same cell. Only a successful
//! decode is stored: after a failed load the next run tries again. Pixel work
//! and JPEG encoding run on the blocking pool.
//!
//! # Overlapping runs
//!
//! Runs are never cancelled: each one computes to the end. What happens to
//! its result depends on [`RecomputePolicy`]:
//!
//! - [`Sequenced`](RecomputePolicy::Sequenced): every run carries a sequence
//!   number and only the latest issued one may write. The newest request
//!   wins no matter which run finishes first. [`reset`](Engine::reset) also
//!   advances the sequence, so a run still in flight cannot overwrite it.
//! - [`LastCompletion`](RecomputePolicy::LastCompletion): every finishing run
//!   writes. The run that finishes last wins, which may be an older request,
//!   and a run in flight during `reset` will overwrite it. This is how the
//!   browser editor behaved; it is kept for parity, not recommended.
//!
//! Under both policies a run started for a previous source is discarded.
//!
//! # Failure
//!
//! A source that cannot be loaded or decoded is not an error for the caller:
//! the run resolves with the original reference as its preview and the
//! engine returns to idle. The failure itself is kept as a typed
//! [`RecomputeError`] up to that point and logged.

use crate::config::EnhancerConfig;
use crate::imaging::{self, CodecError, EncodedImage, Quality};
use crate::presets::{PresetName, PresetRegistry};
use crate::settings::{Channel, ImageSettings};
use crate::source::{SourceError, SourceLoader, SourceRef};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;

/// How overlapping recompute results are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecomputePolicy {
    /// Last invocation wins.
    #[default]
    Sequenced,
    /// Last completion wins.
    LastCompletion,
}

#[derive(Error, Debug)]
pub enum RecomputeError {
    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Pipeline task failed: {0}")]
    Task(String),
}

/// The output a caller should display for the processed side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// The source reference, verbatim. Shown after reset, before the first
    /// run completes, and when decoding failed.
    Original(SourceRef),
    /// A freshly encoded JPEG.
    Enhanced(Arc<EncodedImage>),
}

impl Preview {
    /// Displayable image source: the original locator or a `data:` URI.
    pub fn src(&self) -> String {
        match self {
            Preview::Original(source) => source.as_str().to_string(),
            Preview::Enhanced(image) => image.to_data_uri(),
        }
    }

    pub fn is_original(&self) -> bool {
        matches!(self, Preview::Original(_))
    }
}

/// Point-in-time view of the engine, published on every state change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub source: SourceRef,
    pub settings: ImageSettings,
    pub processed: Preview,
    pub is_processing: bool,
    /// Bumped each time `processed` is replaced.
    pub revision: u64,
}

/// How one recompute run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The run's preview was stored.
    Applied,
    /// Decoding failed; the original reference was stored instead.
    FellBack,
    /// A newer request (or a source change) made this result stale.
    Superseded,
    /// The task panicked or the runtime shut down.
    Aborted,
}

/// Handle to an in-flight recompute.
#[derive(Debug)]
pub struct Recompute {
    seq: u64,
    handle: JoinHandle<Completion>,
}

impl Recompute {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the run to finish.
    pub async fn wait(self) -> Completion {
        self.handle.await.unwrap_or(Completion::Aborted)
    }
}

/// Construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub initial_settings: ImageSettings,
    pub quality: Quality,
    pub policy: RecomputePolicy,
}

impl EngineOptions {
    pub fn from_config(config: &EnhancerConfig, registry: &PresetRegistry) -> Self {
        Self {
            initial_settings: registry.lookup(config.engine.initial_preset),
            quality: config.output.quality(),
            policy: config.engine.recompute_policy,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&EnhancerConfig::default(), &PresetRegistry::standard())
    }
}

struct EngineState {
    source: SourceRef,
    /// Bumped on every source change.
    epoch: u64,
    decoded: Arc<OnceCell<Arc<RgbaImage>>>,
    settings: ImageSettings,
    processed: Preview,
    revision: u64,
    /// Last sequence number handed out.
    issued: u64,
    /// Runs whose result may still be stored.
    pending: BTreeSet<u64>,
}

impl EngineState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            source: self.source.clone(),
            settings: self.settings,
            processed: self.processed.clone(),
            is_processing: !self.pending.is_empty(),
            revision: self.revision,
        }
    }

    fn replace_processed(&mut self, preview: Preview) {
        self.processed = preview;
        self.revision += 1;
    }
}

/// Everything a run needs, captured when it is issued.
pub(crate) struct Ticket {
    pub(crate) seq: u64,
    epoch: u64,
    source: SourceRef,
    decoded: Arc<OnceCell<Arc<RgbaImage>>>,
    settings: ImageSettings,
}

struct Shared {
    state: Mutex<EngineState>,
    loader: Arc<dyn SourceLoader>,
    registry: Arc<PresetRegistry>,
    quality: Quality,
    policy: RecomputePolicy,
    updates: watch::Sender<Snapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EngineState) {
        self.updates.send_replace(state.snapshot());
    }

    fn begin(&self, settings: ImageSettings) -> Ticket {
        let mut state = self.lock();
        state.settings = settings;
        state.issued += 1;
        let seq = state.issued;
        if self.policy == RecomputePolicy::Sequenced {
            state.pending.clear();
        }
        state.pending.insert(seq);
        tracing::debug!(seq, %settings, "Recompute started");
        self.publish(&state);

        Ticket {
            seq,
            epoch: state.epoch,
            source: state.source.clone(),
            decoded: Arc::clone(&state.decoded),
            settings,
        }
    }

    fn finish(
        &self,
        ticket: &Ticket,
        outcome: Result<EncodedImage, Arc<RecomputeError>>,
    ) -> Completion {
        let mut state = self.lock();
        let stale_source = ticket.epoch != state.epoch;
        let superseded = match self.policy {
            RecomputePolicy::Sequenced => ticket.seq != state.issued,
            RecomputePolicy::LastCompletion => false,
        };
        let was_pending = state.pending.remove(&ticket.seq);

        if stale_source || superseded || (!was_pending && self.policy == RecomputePolicy::Sequenced)
        {
            tracing::debug!(seq = ticket.seq, stale_source, "Recompute result discarded");
            self.publish(&state);
            return Completion::Superseded;
        }

        let completion = match outcome {
            Ok(encoded) => {
                tracing::debug!(
                    seq = ticket.seq,
                    bytes = encoded.bytes.len(),
                    "Recompute applied"
                );
                state.replace_processed(Preview::Enhanced(Arc::new(encoded)));
                Completion::Applied
            }
            Err(error) => {
                tracing::warn!(
                    source = %ticket.source.display_short(),
                    error = %error,
                    "Recompute failed, falling back to original"
                );
                state.replace_processed(Preview::Original(ticket.source.clone()));
                Completion::FellBack
            }
        };
        self.publish(&state);
        completion
    }
}

/// Load and decode `source` into a shareable raster.
async fn load_raster(
    loader: &dyn SourceLoader,
    source: &SourceRef,
) -> Result<Arc<RgbaImage>, RecomputeError> {
    let bytes = loader.load(source).await?;
    let raster = tokio::task::spawn_blocking(move || imaging::decode(&bytes))
        .await
        .map_err(|e| RecomputeError::Task(e.to_string()))??;
    tracing::debug!(
        source = %source.display_short(),
        width = raster.width(),
        height = raster.height(),
        "Decoded source"
    );
    Ok(Arc::new(raster))
}

/// One run, start to finish, without touching engine state.
async fn render(
    loader: &dyn SourceLoader,
    ticket: &Ticket,
    quality: Quality,
) -> Result<EncodedImage, Arc<RecomputeError>> {
    let raster = ticket
        .decoded
        .get_or_try_init(|| load_raster(loader, &ticket.source))
        .await
        .map_err(Arc::new)?
        .clone();
    let settings = ticket.settings;
    tokio::task::spawn_blocking(move || {
        let enhanced = imaging::enhance(&raster, &settings);
        imaging::encode_jpeg(&enhanced, quality)
    })
    .await
    .map_err(|e| Arc::new(RecomputeError::Task(e.to_string())))?
    .map_err(|e| Arc::new(RecomputeError::from(e)))
}

/// Live enhancement state for one source image.
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Open `source` and start the first recompute with `options.initial_settings`.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime.
    pub fn open(
        source: SourceRef,
        options: EngineOptions,
        registry: Arc<PresetRegistry>,
        loader: Arc<dyn SourceLoader>,
    ) -> Self {
        let state = EngineState {
            processed: Preview::Original(source.clone()),
            source,
            epoch: 0,
            decoded: Arc::new(OnceCell::new()),
            settings: options.initial_settings,
            revision: 0,
            issued: 0,
            pending: BTreeSet::new(),
        };
        let (updates, _) = watch::channel(state.snapshot());
        let engine = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                loader,
                registry,
                quality: options.quality,
                policy: options.policy,
                updates,
            }),
        };
        engine.recompute(options.initial_settings);
        engine
    }

    fn recompute(&self, settings: ImageSettings) -> Recompute {
        let ticket = self.shared.begin(settings);
        let seq = ticket.seq;
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let outcome = render(shared.loader.as_ref(), &ticket, shared.quality).await;
            shared.finish(&ticket, outcome)
        });
        Recompute { seq, handle }
    }

    /// Replace one channel and recompute. The value is stored as given.
    pub fn update_channel(&self, channel: Channel, value: i32) -> Recompute {
        let settings = self.settings().with_channel(channel, value);
        self.recompute(settings)
    }

    /// Switch to a preset's vector and recompute.
    ///
    /// # Panics
    ///
    /// If the injected registry does not contain `name`.
    pub fn apply_preset(&self, name: PresetName) -> Recompute {
        let settings = self.shared.registry.lookup(name);
        self.recompute(settings)
    }

    /// Apply an arbitrary settings vector and recompute.
    pub fn apply_settings(&self, settings: ImageSettings) -> Recompute {
        self.recompute(settings)
    }

    /// Back to the original preset and the untouched source, synchronously.
    ///
    /// Does not run the pipeline. The preview becomes the source reference
    /// itself, so it is byte-exact rather than a re-encoded copy.
    pub fn reset(&self) {
        let original = self.shared.registry.lookup(PresetName::Original);
        let mut state = self.shared.lock();
        state.settings = original;
        if self.shared.policy == RecomputePolicy::Sequenced {
            state.issued += 1;
            state.pending.clear();
        }
        let source = state.source.clone();
        state.replace_processed(Preview::Original(source));
        tracing::debug!("Reset to original");
        self.shared.publish(&state);
    }

    /// Point the engine at a new source, keeping the current settings.
    ///
    /// Returns `None` when `source` is the one already open.
    pub fn set_source(&self, source: SourceRef) -> Option<Recompute> {
        let settings = {
            let mut state = self.shared.lock();
            if state.source == source {
                return None;
            }
            tracing::debug!(source = %source.display_short(), "Source changed");
            state.epoch += 1;
            state.decoded = Arc::new(OnceCell::new());
            state.pending.clear();
            state.replace_processed(Preview::Original(source.clone()));
            state.source = source;
            state.settings
        };
        Some(self.recompute(settings))
    }

    pub fn settings(&self) -> ImageSettings {
        self.shared.lock().settings
    }

    pub fn processed(&self) -> Preview {
        self.shared.lock().processed.clone()
    }

    /// The original reference, as supplied.
    pub fn original(&self) -> SourceRef {
        self.shared.lock().source.clone()
    }

    pub fn is_processing(&self) -> bool {
        !self.shared.lock().pending.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().snapshot()
    }

    pub fn registry(&self) -> &Arc<PresetRegistry> {
        &self.shared.registry
    }

    pub fn policy(&self) -> RecomputePolicy {
        self.shared.policy
    }

    /// Receive a [`Snapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until no run is pending.
    pub async fn settled(&self) -> Snapshot {
        let mut updates = self.subscribe();
        let result = updates.wait_for(|s| !s.is_processing).await;
        match result {
            Ok(snapshot) => (*snapshot).clone(),
            // Sender lives in `self`, so this only happens during teardown.
            Err(_) => self.snapshot(),
        }
    }

    #[cfg(test)]
    pub(crate) fn begin_manual(&self, settings: ImageSettings) -> Ticket {
        self.shared.begin(settings)
    }

    #[cfg(test)]
    pub(crate) fn finish_manual(
        &self,
        ticket: &Ticket,
        outcome: Result<EncodedImage, Arc<RecomputeError>>,
    ) -> Completion {
        self.shared.finish(ticket, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::MockLoader;
    use image::{ImageFormat, Rgba};

    const SRC: &str = "products/mug.png";

    fn raster() -> RgbaImage {
        RgbaImage::from_fn(12, 8, |x, y| Rgba([(x * 20) as u8, (y * 30) as u8, 77, 255]))
    }

    fn png(raster: &RgbaImage) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        raster.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn expected(settings: ImageSettings) -> EncodedImage {
        imaging::encode_jpeg(&imaging::enhance(&raster(), &settings), Quality::default()).unwrap()
    }

    fn options(policy: RecomputePolicy) -> EngineOptions {
        EngineOptions {
            policy,
            ..EngineOptions::default()
        }
    }

    fn open_with(policy: RecomputePolicy) -> (Engine, Arc<MockLoader>) {
        let loader = Arc::new(MockLoader::with_source(SRC, png(&raster())));
        let engine = Engine::open(
            SourceRef::new(SRC),
            options(policy),
            PresetRegistry::standard(),
            loader.clone(),
        );
        (engine, loader)
    }

    fn enhanced(settings: ImageSettings) -> Preview {
        Preview::Enhanced(Arc::new(expected(settings)))
    }

    #[tokio::test]
    async fn open_starts_with_product_preset_and_processes() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        let product = PresetRegistry::standard().lookup(PresetName::Product);
        assert_eq!(engine.settings(), product);

        let snapshot = engine.settled().await;
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.processed, enhanced(product));
    }

    #[tokio::test]
    async fn update_channel_replaces_one_field_and_recomputes() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        engine.settled().await;

        let run = engine.update_channel(Channel::Warmth, 60);
        assert!(engine.is_processing());
        assert_eq!(run.wait().await, Completion::Applied);

        let settings = ImageSettings::new(15, 15, 20, 60, 40);
        assert_eq!(engine.settings(), settings);
        assert_eq!(engine.processed(), enhanced(settings));
        assert!(!engine.is_processing());
    }

    #[tokio::test]
    async fn apply_preset_then_read_settings_matches_registry() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        let registry = PresetRegistry::standard();
        for name in PresetName::ALL {
            let run = engine.apply_preset(name);
            assert_eq!(engine.settings(), registry.lookup(name));
            run.wait().await;
            assert_eq!(engine.settings(), registry.lookup(name));
        }
    }

    #[tokio::test]
    async fn source_is_decoded_once_across_runs() {
        let (engine, loader) = open_with(RecomputePolicy::Sequenced);
        engine.update_channel(Channel::Brightness, 5).wait().await;
        engine.update_channel(Channel::Brightness, 6).wait().await;
        engine.apply_preset(PresetName::Cinematic).wait().await;
        assert_eq!(loader.request_count(SRC), 1);
    }

    #[tokio::test]
    async fn reset_is_synchronous_and_byte_exact() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        engine.update_channel(Channel::Contrast, 80).wait().await;
        assert!(!engine.processed().is_original());

        engine.reset();
        assert!(!engine.is_processing());
        assert_eq!(engine.settings(), ImageSettings::IDENTITY);
        assert_eq!(engine.processed(), Preview::Original(SourceRef::new(SRC)));
        assert_eq!(engine.processed().src(), SRC);
    }

    #[tokio::test]
    async fn reset_wins_over_run_in_flight_when_sequenced() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        engine.settled().await;

        let ticket = engine.begin_manual(ImageSettings::new(50, 0, 0, 0, 0));
        engine.reset();
        assert!(!engine.is_processing());

        let completion =
            engine.finish_manual(&ticket, Ok(expected(ImageSettings::new(50, 0, 0, 0, 0))));
        assert_eq!(completion, Completion::Superseded);
        assert!(engine.processed().is_original());
    }

    #[tokio::test]
    async fn sequenced_policy_applies_latest_invocation_even_if_it_finishes_first() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        engine.settled().await;

        let first = ImageSettings::new(10, 0, 0, 0, 0);
        let second = ImageSettings::new(20, 0, 0, 0, 0);
        let t1 = engine.begin_manual(first);
        let t2 = engine.begin_manual(second);

        assert_eq!(
            engine.finish_manual(&t2, Ok(expected(second))),
            Completion::Applied
        );
        assert!(!engine.is_processing());
        assert_eq!(
            engine.finish_manual(&t1, Ok(expected(first))),
            Completion::Superseded
        );

        assert_eq!(engine.settings(), second);
        assert_eq!(engine.processed(), enhanced(second));
    }

    #[tokio::test]
    async fn last_completion_policy_lets_the_slower_older_run_win() {
        let (engine, _) = open_with(RecomputePolicy::LastCompletion);
        engine.settled().await;

        let first = ImageSettings::new(10, 0, 0, 0, 0);
        let second = ImageSettings::new(20, 0, 0, 0, 0);
        let t1 = engine.begin_manual(first);
        let t2 = engine.begin_manual(second);

        assert_eq!(
            engine.finish_manual(&t2, Ok(expected(second))),
            Completion::Applied
        );
        // The first run is still out, so the engine is still busy.
        assert!(engine.is_processing());
        assert_eq!(
            engine.finish_manual(&t1, Ok(expected(first))),
            Completion::Applied
        );
        assert!(!engine.is_processing());

        // Settings reflect the last call; the preview reflects the last finisher.
        assert_eq!(engine.settings(), second);
        assert_eq!(engine.processed(), enhanced(first));
    }

    #[tokio::test]
    async fn rapid_updates_settle_on_the_latest_settings_when_sequenced() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        let a = engine.update_channel(Channel::Saturation, -50);
        let b = engine.update_channel(Channel::Saturation, 70);
        let (ra, rb) = (a.wait().await, b.wait().await);
        assert_eq!(rb, Completion::Applied);
        assert_eq!(ra, Completion::Superseded);

        let settings = ImageSettings::new(15, 15, 70, -5, 40);
        assert_eq!(engine.settings(), settings);
        assert_eq!(engine.settled().await.processed, enhanced(settings));
    }

    #[tokio::test]
    async fn decode_failure_falls_back_to_original_reference() {
        let loader = Arc::new(MockLoader::with_source(SRC, b"not an image".to_vec()));
        let engine = Engine::open(
            SourceRef::new(SRC),
            EngineOptions::default(),
            PresetRegistry::standard(),
            loader,
        );
        let snapshot = engine.settled().await;
        assert!(!snapshot.is_processing);
        assert_eq!(snapshot.processed, Preview::Original(SourceRef::new(SRC)));

        let completion = engine.update_channel(Channel::Brightness, 30).wait().await;
        assert_eq!(completion, Completion::FellBack);
        assert_eq!(engine.processed().src(), SRC);
    }

    #[tokio::test]
    async fn failed_load_is_retried_on_next_run() {
        let loader = Arc::new(MockLoader::default());
        let engine = Engine::open(
            SourceRef::new(SRC),
            EngineOptions::default(),
            PresetRegistry::standard(),
            loader.clone(),
        );
        assert_eq!(engine.settled().await.processed.src(), SRC);

        loader.insert(SRC, png(&raster()));
        let completion = engine.update_channel(Channel::Brightness, 30).wait().await;
        assert_eq!(completion, Completion::Applied);
        assert_eq!(loader.request_count(SRC), 2);
        let settings = ImageSettings::new(30, 15, 20, -5, 40);
        assert_eq!(engine.processed(), enhanced(settings));

        engine.update_channel(Channel::Brightness, 31).wait().await;
        assert_eq!(loader.request_count(SRC), 2);
    }

    #[tokio::test]
    async fn missing_source_falls_back_without_hanging() {
        let engine = Engine::open(
            SourceRef::new("missing.jpg"),
            EngineOptions::default(),
            PresetRegistry::standard(),
            Arc::new(MockLoader::default()),
        );
        let snapshot = engine.settled().await;
        assert_eq!(snapshot.processed.src(), "missing.jpg");
    }

    #[tokio::test]
    async fn set_source_keeps_current_settings_and_decodes_new_source() {
        let (engine, loader) = open_with(RecomputePolicy::Sequenced);
        engine.apply_preset(PresetName::Lifestyle).wait().await;

        let other = RgbaImage::from_pixel(4, 4, Rgba([200, 40, 40, 255]));
        loader.insert("products/bag.png", png(&other));

        let run = engine
            .set_source(SourceRef::new("products/bag.png"))
            .expect("new source triggers a recompute");
        assert!(engine.processed().is_original());
        assert_eq!(run.wait().await, Completion::Applied);

        let lifestyle = PresetRegistry::standard().lookup(PresetName::Lifestyle);
        assert_eq!(engine.settings(), lifestyle);
        let want = imaging::encode_jpeg(&imaging::enhance(&other, &lifestyle), Quality::default())
            .unwrap();
        assert_eq!(engine.processed(), Preview::Enhanced(Arc::new(want)));
        assert_eq!(engine.original().as_str(), "products/bag.png");
        assert_eq!(loader.request_count("products/bag.png"), 1);
    }

    #[tokio::test]
    async fn set_source_to_same_reference_is_a_no_op() {
        let (engine, loader) = open_with(RecomputePolicy::Sequenced);
        engine.settled().await;
        assert!(engine.set_source(SourceRef::new(SRC)).is_none());
        assert_eq!(loader.request_count(SRC), 1);
    }

    #[tokio::test]
    async fn results_for_previous_source_are_discarded_under_either_policy() {
        for policy in [RecomputePolicy::Sequenced, RecomputePolicy::LastCompletion] {
            let (engine, loader) = open_with(policy);
            engine.settled().await;
            loader.insert("other.png", png(&raster()));

            let stale = engine.begin_manual(ImageSettings::new(30, 0, 0, 0, 0));
            engine.set_source(SourceRef::new("other.png")).unwrap().wait().await;
            let completion =
                engine.finish_manual(&stale, Ok(expected(ImageSettings::new(30, 0, 0, 0, 0))));
            assert_eq!(completion, Completion::Superseded, "{policy:?}");
        }
    }

    #[tokio::test]
    async fn subscribers_see_each_applied_preview() {
        let (engine, _) = open_with(RecomputePolicy::Sequenced);
        engine.settled().await;
        let mut updates = engine.subscribe();
        let before = updates.borrow_and_update().revision;

        engine.apply_preset(PresetName::CleanWeb).wait().await;
        updates.changed().await.unwrap();
        let snapshot = updates.borrow_and_update().clone();
        assert!(snapshot.revision > before);
        assert_eq!(
            snapshot.settings,
            PresetRegistry::standard().lookup(PresetName::CleanWeb)
        );
    }

    #[tokio::test]
    #[should_panic(expected = "is not registered")]
    async fn apply_preset_missing_from_injected_registry_panics() {
        let registry = Arc::new(PresetRegistry::new(vec![
            *PresetRegistry::standard().get(PresetName::Original),
        ]));
        let loader = Arc::new(MockLoader::with_source(SRC, png(&raster())));
        let options = EngineOptions {
            initial_settings: ImageSettings::IDENTITY,
            ..EngineOptions::default()
        };
        let engine = Engine::open(SourceRef::new(SRC), options, registry, loader);
        engine.apply_preset(PresetName::AdReady);
    }

    #[test]
    fn policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&RecomputePolicy::LastCompletion).unwrap(),
            "\"last-completion\""
        );
    }
}
