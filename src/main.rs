use clap::{Parser, Subcommand, ValueEnum};
use image_enhancer::batch::{self, BatchOptions};
use image_enhancer::config::{self, EnhancerConfig};
use image_enhancer::engine::{Engine, EngineOptions, Preview};
use image_enhancer::imaging::Quality;
use image_enhancer::output;
use image_enhancer::presets::{PresetName, PresetRegistry};
use image_enhancer::preview::PreviewCoordinator;
use image_enhancer::settings::{Channel, ImageSettings, Locale};
use image_enhancer::source::{DefaultLoader, SourceKind, SourceRef};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "image-enhancer")]
#[command(about = "Five-channel photo enhancement with presets")]
#[command(long_about = "\
Five-channel photo enhancement with presets

Adjusts brightness, contrast, saturation, warmth and sharpness of product
photos and writes the result as JPEG. Start from a preset and override
individual channels:

  image-enhancer apply mug.png --preset ad-ready --warmth 12
  image-enhancer batch shoot/ --out enhanced/ --preset clean-web

Presets:
  original    0   0   0   0   0
  adReady    10  20  25   5  30
  cleanWeb    5  10  10   0  15
  cinematic  -5  25 -10  15  20
  product    15  15  20  -5  40
  lifestyle   8  10  15  20  10

Sources may be file paths, http(s) URLs, or data: URIs.

Run 'image-enhancer gen-config' to generate a documented enhancer.toml.
Set RUST_LOG=image_enhancer=debug for engine tracing.")]
#[command(version)]
struct Cli {
    /// Config file [default: ./enhancer.toml if present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Language for preset and channel labels
    #[arg(long, value_enum, default_value_t = LocaleArg::En, global = true)]
    locale: LocaleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LocaleArg {
    En,
    Mm,
}

impl From<LocaleArg> for Locale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::En => Locale::Primary,
            LocaleArg::Mm => Locale::Secondary,
        }
    }
}

/// Settings selection shared by `apply` and `batch`.
#[derive(clap::Args, Clone)]
struct AdjustArgs {
    /// Preset to start from [default: engine.initial_preset]
    #[arg(long, short)]
    preset: Option<PresetName>,
    /// Brightness override (-100..100)
    #[arg(long, allow_negative_numbers = true)]
    brightness: Option<i32>,
    /// Contrast override (-100..100)
    #[arg(long, allow_negative_numbers = true)]
    contrast: Option<i32>,
    /// Saturation override (-100..100)
    #[arg(long, allow_negative_numbers = true)]
    saturation: Option<i32>,
    /// Warmth override (-100..100)
    #[arg(long, allow_negative_numbers = true)]
    warmth: Option<i32>,
    /// Sharpness override (0..100)
    #[arg(long)]
    sharpness: Option<i32>,
    /// JPEG quality override (1-100)
    #[arg(long)]
    quality: Option<u32>,
}

impl AdjustArgs {
    fn overrides(&self) -> [(Channel, Option<i32>); 5] {
        [
            (Channel::Brightness, self.brightness),
            (Channel::Contrast, self.contrast),
            (Channel::Saturation, self.saturation),
            (Channel::Warmth, self.warmth),
            (Channel::Sharpness, self.sharpness),
        ]
    }

    fn settings(&self, registry: &PresetRegistry, config: &EnhancerConfig) -> ImageSettings {
        let base = registry.lookup(self.preset.unwrap_or(config.engine.initial_preset));
        self.overrides()
            .into_iter()
            .fold(base, |settings, (channel, value)| match value {
                Some(v) => settings.with_channel(channel, v),
                None => settings,
            })
    }

    fn quality(&self, config: &EnhancerConfig) -> Quality {
        self.quality
            .map(Quality::new)
            .unwrap_or_else(|| config.output.quality())
    }
}

/// Shared flags for commands that write many images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the output cache and re-encode every image
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Enhance one image and write it as JPEG
    Apply {
        /// File path, http(s) URL, or data: URI
        source: String,
        #[command(flatten)]
        adjust: AdjustArgs,
        /// Output file [default: <stem>-enhanced.jpg next to the source]
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Print the result as a data: URI instead of writing a file
        #[arg(long, conflicts_with = "output")]
        data_uri: bool,
        /// Print a JSON summary
        #[arg(long)]
        json: bool,
    },
    /// List the built-in presets
    Presets {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enhance every image under a directory
    Batch {
        /// Directory to scan for jpg, jpeg, png and webp files
        input: PathBuf,
        /// Output directory
        #[arg(long, default_value = "enhanced")]
        out: PathBuf,
        #[command(flatten)]
        adjust: AdjustArgs,
        #[command(flatten)]
        cache: CacheArgs,
        /// Print a JSON summary instead of progress lines
        #[arg(long)]
        json: bool,
    },
    /// Print a stock enhancer.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let locale = Locale::from(cli.locale);

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Presets { json } => {
            let registry = PresetRegistry::standard();
            if json {
                let presets: Vec<_> = registry
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "label": p.label.get(locale),
                            "settings": p.settings,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                output::print_presets(&registry, locale);
            }
        }
        Command::Apply {
            source,
            adjust,
            output: out_path,
            data_uri,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let registry = PresetRegistry::standard();
            let options = EngineOptions {
                initial_settings: adjust.settings(&registry, &config),
                quality: adjust.quality(&config),
                policy: config.engine.recompute_policy,
            };
            let loader = Arc::new(DefaultLoader::new(&config.fetch)?);
            let source = SourceRef::new(source);

            let engine = Engine::open(source.clone(), options, Arc::clone(&registry), loader);
            let snapshot = engine.settled().await;
            let coordinator = PreviewCoordinator::new(engine);
            let preset = coordinator.active_preset();
            let preset_label = preset.map(|name| coordinator.preset_label(name, locale));

            let Preview::Enhanced(image) = &snapshot.processed else {
                output::print_apply(&source, preset_label, &snapshot.settings, None);
                return Err(format!("{}: could not load or decode source", source.display_short()).into());
            };

            if data_uri {
                println!("{}", image.to_data_uri());
                return Ok(());
            }

            let path = out_path.unwrap_or_else(|| default_output_path(&source));
            tokio::fs::write(&path, &image.bytes).await?;

            if json {
                let summary = serde_json::json!({
                    "source": source.display_short(),
                    "preset": preset,
                    "settings": snapshot.settings,
                    "output": path,
                    "width": image.width,
                    "height": image.height,
                    "bytes": image.bytes.len(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_apply(
                    &source,
                    preset_label,
                    &snapshot.settings,
                    Some((path.as_path(), image.as_ref())),
                );
            }
        }
        Command::Batch {
            input,
            out,
            adjust,
            cache,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let registry = PresetRegistry::standard();
            init_thread_pool(&config.processing);
            let options = BatchOptions {
                settings: adjust.settings(&registry, &config),
                quality: adjust.quality(&config),
                use_cache: !cache.no_cache,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if json {
                        continue;
                    }
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = tokio::task::spawn_blocking(move || {
                batch::run(&input, &out, &options, Some(tx))
            })
            .await??;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_batch_summary(&summary);
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "image_enhancer=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// An explicit `--config` must exist; the implicit one is optional.
fn load_config(path: Option<&Path>) -> Result<EnhancerConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) if !p.exists() => Err(format!("config file not found: {}", p.display()).into()),
        Some(p) => Ok(config::load_config(p)?),
        None => Ok(config::load_config(Path::new(config::CONFIG_FILENAME))?),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// `<stem>-enhanced.jpg` next to a file source, `enhanced.jpg` otherwise.
fn default_output_path(source: &SourceRef) -> PathBuf {
    match source.kind() {
        SourceKind::File(path) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            path.with_file_name(format!("{stem}-enhanced.jpg"))
        }
        SourceKind::Data(_) | SourceKind::Remote(_) => PathBuf::from("enhanced.jpg"),
    }
}
