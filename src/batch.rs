//! Bulk enhancement of a directory tree.
//!
//! Applies one settings vector to every decodable image under an input
//! directory and writes JPEG results to an output directory, mirroring the
//! relative layout:
//!
//! ```text
//! shoot/                         enhanced/
//! ├── mug.png                    ├── .enhance-cache.json
//! ├── hero.webp          ──▶     ├── mug.jpg
//! └── lifestyle/                 ├── hero.jpg
//!     └── sofa.jpeg              └── lifestyle/
//!                                    └── sofa.jpg
//! ```
//!
//! Images are processed in parallel on the global [rayon] pool. A file that
//! cannot be read or decoded is reported as a failure and the rest of the
//! batch continues. Only problems with the directories themselves are fatal.
//!
//! Progress is reported through an optional `mpsc` channel of
//! [`BatchEvent`]s so the CLI can print while workers run.
//!
//! Re-runs are incremental through [`CacheManifest`].

use crate::cache::{self, CacheManifest, CacheStats};
use crate::imaging::{self, CodecError, Quality, codec};
use crate::settings::ImageSettings;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Why one file was skipped.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Codec(#[from] CodecError),
    #[error("output {0} is already produced by another source")]
    OutputCollision(String),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub settings: ImageSettings,
    pub quality: Quality,
    /// `false` ignores the manifest on disk (`--no-cache`).
    pub use_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Output already on disk for this content and settings.
    Cached,
    /// Copied from where the same content was written before.
    Copied,
    /// Decoded, enhanced and encoded.
    Enhanced,
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageDone {
        index: usize,
        source_path: String,
        output_path: String,
        status: ImageStatus,
    },
    ImageFailed {
        index: usize,
        source_path: String,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub source_path: String,
    pub output_path: String,
    pub status: ImageStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub source_path: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub outputs: Vec<BatchOutput>,
    pub failures: Vec<BatchFailure>,
    #[serde(skip)]
    pub cache_stats: CacheStats,
}

/// Decodable images under `root`, relative to it, sorted.
///
/// Hidden entries and anything under `exclude` are skipped. `exclude` only
/// counts if it exists.
pub fn find_images(root: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::NotADirectory(root.to_path_buf()));
    }
    // Compare canonical forms so `.` and `enhanced` still exclude each other.
    let root = root.canonicalize()?;
    let exclude = exclude.and_then(|p| p.canonicalize().ok());
    let mut images = Vec::new();
    let walker = WalkDir::new(&root).sort_by_file_name().into_iter().filter_entry(|e| {
        let hidden = e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.');
        !hidden && exclude.as_deref().is_none_or(|ex| e.path() != ex)
    });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(codec::is_supported_extension);
        if supported && let Ok(rel) = entry.path().strip_prefix(&root) {
            images.push(rel.to_path_buf());
        }
    }
    Ok(images)
}

/// Output path for a source: same relative directory, `.jpg` extension.
pub fn output_name(rel: &Path) -> String {
    slash_path(&rel.with_extension("jpg"))
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

struct Job {
    index: usize,
    rel: PathBuf,
    output: String,
    /// Set when an earlier source already claimed `output`.
    collision: bool,
}

/// What a job will do, decided before any output is written.
enum Action {
    /// `output` already holds this content.
    Keep,
    /// Copy from another output holding this content.
    Copy(String),
    Encode,
}

struct Planned {
    source_hash: String,
    action: Action,
}

struct Done {
    status: ImageStatus,
    source_hash: String,
}

/// Enhance every image under `input_dir` into `output_dir`.
pub fn run(
    input_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    if !input_dir.is_dir() {
        return Err(BatchError::NotADirectory(input_dir.to_path_buf()));
    }
    std::fs::create_dir_all(output_dir)?;
    let images = find_images(input_dir, Some(output_dir))?;

    let mut manifest = if options.use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };
    let params_hash = cache::hash_params(&options.settings, options.quality);

    let mut claimed = HashSet::new();
    let jobs: Vec<Job> = images
        .into_iter()
        .enumerate()
        .map(|(index, rel)| {
            let output = output_name(&rel);
            let collision = !claimed.insert(output.clone());
            Job {
                index: index + 1,
                rel,
                output,
                collision,
            }
        })
        .collect();

    tracing::debug!(
        total = jobs.len(),
        settings = %options.settings,
        "Starting batch"
    );
    if let Some(tx) = &progress {
        tx.send(BatchEvent::Started { total: jobs.len() }).ok();
    }

    let hashed: Vec<Result<String, FileError>> = jobs
        .par_iter()
        .map(|job| hash_source(input_dir, job))
        .collect();
    let planned = plan(&jobs, hashed, &manifest, &params_hash, output_dir);

    let results: Vec<(&Job, Result<Done, FileError>)> = jobs
        .par_iter()
        .zip(planned)
        .map(|(job, planned)| {
            let result =
                planned.and_then(|planned| execute(input_dir, output_dir, job, options, planned));
            if let Some(tx) = &progress {
                let source_path = slash_path(&job.rel);
                let event = match &result {
                    Ok(done) => BatchEvent::ImageDone {
                        index: job.index,
                        source_path,
                        output_path: job.output.clone(),
                        status: done.status,
                    },
                    Err(e) => BatchEvent::ImageFailed {
                        index: job.index,
                        source_path,
                        error: e.to_string(),
                    },
                };
                tx.send(event).ok();
            }
            (job, result)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (job, result) in results {
        let source_path = slash_path(&job.rel);
        match result {
            Ok(done) => {
                match done.status {
                    ImageStatus::Cached => summary.cache_stats.hits += 1,
                    ImageStatus::Copied => summary.cache_stats.copies += 1,
                    ImageStatus::Enhanced => summary.cache_stats.misses += 1,
                }
                manifest.insert(job.output.clone(), done.source_hash, params_hash.clone());
                summary.outputs.push(BatchOutput {
                    source_path,
                    output_path: job.output.clone(),
                    status: done.status,
                });
            }
            Err(e) => {
                tracing::warn!(source = %source_path, error = %e, "Skipping image");
                summary.failures.push(BatchFailure {
                    source_path,
                    error: e.to_string(),
                });
            }
        }
    }

    manifest.save(output_dir)?;
    tracing::debug!(cache = %summary.cache_stats, failed = summary.failures.len(), "Batch finished");
    Ok(summary)
}

fn hash_source(input_dir: &Path, job: &Job) -> Result<String, FileError> {
    if job.collision {
        return Err(FileError::OutputCollision(job.output.clone()));
    }
    let bytes = std::fs::read(input_dir.join(&job.rel))?;
    Ok(cache::hash_bytes(&bytes))
}

/// Decide every job's action up front.
///
/// Jobs then run in parallel, so a copy may only read an output that no job
/// in this run writes. Otherwise it could pick up the new content.
fn plan(
    jobs: &[Job],
    hashed: Vec<Result<String, FileError>>,
    manifest: &CacheManifest,
    params_hash: &str,
    output_dir: &Path,
) -> Vec<Result<Planned, FileError>> {
    let found: Vec<Result<(String, Option<&str>), FileError>> = jobs
        .iter()
        .zip(hashed)
        .map(|(job, hash)| {
            let hash = hash?;
            let stored = manifest.find(&hash, params_hash, &job.output, output_dir);
            Ok((hash, stored))
        })
        .collect();

    let written: HashSet<&str> = jobs
        .iter()
        .zip(&found)
        .filter_map(|(job, found)| match found {
            Ok((_, Some(stored))) if *stored == job.output => None,
            Ok(_) => Some(job.output.as_str()),
            Err(_) => None,
        })
        .collect();

    jobs.iter()
        .zip(found)
        .map(|(job, found)| {
            let (source_hash, stored) = found?;
            let action = match stored {
                Some(stored) if stored == job.output => Action::Keep,
                Some(stored) if !written.contains(stored) => Action::Copy(stored.to_string()),
                Some(stored) => {
                    tracing::debug!(
                        output = %job.output,
                        stored,
                        "Cached copy source is rewritten in this run, re-encoding"
                    );
                    Action::Encode
                }
                None => Action::Encode,
            };
            Ok(Planned {
                source_hash,
                action,
            })
        })
        .collect()
}

fn execute(
    input_dir: &Path,
    output_dir: &Path,
    job: &Job,
    options: &BatchOptions,
    planned: Planned,
) -> Result<Done, FileError> {
    let target = output_dir.join(&job.output);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let status = match planned.action {
        Action::Keep => ImageStatus::Cached,
        Action::Copy(stored) => {
            std::fs::copy(output_dir.join(stored), &target)?;
            ImageStatus::Copied
        }
        Action::Encode => {
            let bytes = std::fs::read(input_dir.join(&job.rel))?;
            let raster = imaging::decode(&bytes)?;
            let enhanced = imaging::enhance(&raster, &options.settings);
            let encoded = imaging::encode_jpeg(&enhanced, options.quality)?;
            std::fs::write(&target, &encoded.bytes)?;
            ImageStatus::Enhanced
        }
    };
    Ok(Done {
        status,
        source_hash: planned.source_hash,
    })
}
