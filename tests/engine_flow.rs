//! End-to-end engine behavior through the production loader.

use image::{ImageFormat, Rgba, RgbaImage};
use image_enhancer::config::FetchConfig;
use image_enhancer::engine::{Completion, Engine, EngineOptions, Preview, RecomputePolicy};
use image_enhancer::imaging::{self, Quality};
use image_enhancer::presets::{PresetName, PresetRegistry};
use image_enhancer::preview::PreviewCoordinator;
use image_enhancer::settings::{Channel, ImageSettings};
use image_enhancer::source::{DefaultLoader, SourceRef};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample() -> RgbaImage {
    RgbaImage::from_fn(16, 10, |x, y| {
        Rgba([(x * 15) as u8, (y * 25) as u8, ((x + y) * 7) as u8, 255])
    })
}

fn png_bytes(raster: &RgbaImage) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    raster.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn loader() -> Arc<DefaultLoader> {
    Arc::new(DefaultLoader::new(&FetchConfig::default()).unwrap())
}

fn open(source: SourceRef) -> Engine {
    Engine::open(
        source,
        EngineOptions::default(),
        PresetRegistry::standard(),
        loader(),
    )
}

fn expected_src(settings: ImageSettings) -> String {
    imaging::encode_jpeg(&imaging::enhance(&sample(), &settings), Quality::default())
        .unwrap()
        .to_data_uri()
}

#[tokio::test]
async fn uploaded_data_uri_enhances_and_resets_to_exact_source() {
    let source = SourceRef::from_upload(&png_bytes(&sample()), "image/png");
    let engine = open(source.clone());

    let product = PresetRegistry::standard().lookup(PresetName::Product);
    let snapshot = engine.settled().await;
    assert_eq!(snapshot.processed.src(), expected_src(product));

    engine.reset();
    assert_eq!(engine.processed().src(), source.as_str());
    assert_eq!(engine.settings(), ImageSettings::IDENTITY);
}

#[tokio::test]
async fn file_source_slider_edits_settle_on_last_value() {
    let tmp = tempfile::TempDir::new().unwrap();
    let file = tmp.path().join("mug.png");
    std::fs::write(&file, png_bytes(&sample())).unwrap();

    let engine = open(SourceRef::new(file.to_string_lossy().to_string()));
    let runs: Vec<_> = (1..=5)
        .map(|step| engine.update_channel(Channel::Brightness, step * 10))
        .collect();
    let mut outcomes = Vec::new();
    for run in runs {
        outcomes.push(run.wait().await);
    }
    assert_eq!(outcomes.last(), Some(&Completion::Applied));

    let final_settings = ImageSettings::new(50, 15, 20, -5, 40);
    assert_eq!(engine.settings(), final_settings);
    let snapshot = engine.settled().await;
    assert_eq!(snapshot.processed.src(), expected_src(final_settings));
}

#[tokio::test]
async fn remote_source_is_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/lamp.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(&sample())))
        .expect(1)
        .mount(&server)
        .await;

    let engine = open(SourceRef::new(format!("{}/catalog/lamp.png", server.uri())));
    engine.settled().await;
    engine.apply_preset(PresetName::Cinematic).wait().await;
    engine.apply_preset(PresetName::Lifestyle).wait().await;

    let lifestyle = PresetRegistry::standard().lookup(PresetName::Lifestyle);
    assert_eq!(engine.processed().src(), expected_src(lifestyle));
}

#[tokio::test]
async fn remote_error_falls_back_to_original_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.jpg", server.uri());
    let engine = open(SourceRef::new(url.clone()));
    let snapshot = engine.settled().await;
    assert!(!snapshot.is_processing);
    assert_eq!(snapshot.processed, Preview::Original(SourceRef::new(url)));
}

#[tokio::test]
async fn last_completion_policy_still_settles_to_idle() {
    let source = SourceRef::from_upload(&png_bytes(&sample()), "image/png");
    let options = EngineOptions {
        policy: RecomputePolicy::LastCompletion,
        ..EngineOptions::default()
    };
    let engine = Engine::open(source, options, PresetRegistry::standard(), loader());
    engine.update_channel(Channel::Contrast, -30);
    engine.update_channel(Channel::Contrast, 30);
    let snapshot = engine.settled().await;
    assert!(!snapshot.is_processing);
    assert!(!snapshot.processed.is_original());
}

#[tokio::test]
async fn coordinator_compare_and_active_preset() {
    let source = SourceRef::from_upload(&png_bytes(&sample()), "image/png");
    let coordinator = PreviewCoordinator::new(open(source.clone()));
    coordinator.engine().settled().await;

    coordinator.apply_preset(PresetName::AdReady).wait().await;
    assert_eq!(coordinator.active_preset(), Some(PresetName::AdReady));
    let processed = coordinator.displayed();

    {
        let _hold = coordinator.hold_compare();
        assert_eq!(coordinator.displayed().src(), source.as_str());
    }
    assert_eq!(coordinator.displayed(), processed);
}
