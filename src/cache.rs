//! Output cache for batch enhancement.
//!
//! Re-running a batch over a directory should only touch images whose
//! pixels or settings changed. The cache records, for each written output,
//! the hash of its source bytes and the hash of the parameters that produced
//! it. A later run with the same pair reuses the file on disk.
//!
//! ## Keys
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based,
//!   so it survives `git checkout` and file copies that reset mtimes.
//! - **`params_hash`**: SHA-256 of the five channel values and the JPEG
//!   quality. Changing any slider or the quality invalidates the entry.
//!
//! Lookups go by `(source_hash, params_hash)`, not by output path. Renaming
//! a source file therefore costs a copy, not a re-encode.
//!
//! A hit requires a matching entry **and** the recorded output still on disk.
//!
//! ## Storage
//!
//! `<output_dir>/.enhance-cache.json`, next to the outputs it describes.
//! A missing, corrupt, or version-mismatched manifest loads as empty.
//! `--no-cache` starts from an empty manifest and overwrites outputs.

use crate::imaging::Quality;
use crate::settings::{Channel, ImageSettings};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".enhance-cache.json";

/// Bump when the pipeline's pixel math changes, so stale outputs are redone.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// Output path (relative to the output directory) → entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → output path. Rebuilt on load.
    #[serde(skip)]
    by_content: HashMap<String, String>,
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

impl CacheEntry {
    fn content_key(&self) -> String {
        content_key(&self.source_hash, &self.params_hash)
    }
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            by_content: HashMap::new(),
        }
    }

    pub fn load(output_dir: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(manifest_path(output_dir)) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            tracing::debug!(
                found = manifest.version,
                expected = MANIFEST_VERSION,
                "Cache manifest version changed, starting fresh"
            );
            return Self::empty();
        }
        manifest.by_content = manifest
            .entries
            .iter()
            .map(|(path, e)| (e.content_key(), path.clone()))
            .collect();
        manifest
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Output path already holding this content, if it still exists.
    ///
    /// `target` itself wins when its entry matches; otherwise the last path
    /// the content was written to, which the caller may copy from.
    pub fn find(
        &self,
        source_hash: &str,
        params_hash: &str,
        target: &str,
        output_dir: &Path,
    ) -> Option<&str> {
        let key = content_key(source_hash, params_hash);
        let on_disk = |path: &String| output_dir.join(path).exists();
        if let Some((path, entry)) = self.entries.get_key_value(target)
            && entry.content_key() == key
            && on_disk(path)
        {
            return Some(path.as_str());
        }
        self.by_content
            .get(&key)
            .filter(|path| on_disk(*path))
            .map(String::as_str)
    }

    /// Record an output, replacing whatever `output_path` held before.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let entry = CacheEntry {
            source_hash,
            params_hash,
        };
        let key = entry.content_key();
        if let Some(previous) = self.entries.get(&output_path) {
            let previous_key = previous.content_key();
            if self.by_content.get(&previous_key) == Some(&output_path) {
                self.by_content.remove(&previous_key);
            }
        }
        self.by_content.insert(key, output_path.clone());
        self.entries.insert(output_path, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

/// SHA-256 of `bytes` as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of the parameters that determine an output's bytes.
///
/// Settings are clamped first: two vectors the pipeline treats identically
/// share a key.
pub fn hash_params(settings: &ImageSettings, quality: Quality) -> String {
    let settings = settings.clamped();
    let mut hasher = Sha256::new();
    hasher.update(b"enhance\0");
    for channel in Channel::ALL {
        hasher.update(settings.get(channel).to_le_bytes());
    }
    hasher.update([quality.value()]);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits, self.copies) {
            (0, 0) => write!(f, "{} enhanced", self.misses),
            (_, 0) => write!(
                f,
                "{} cached, {} enhanced ({} total)",
                self.hits,
                self.misses,
                self.total()
            ),
            _ => write!(
                f,
                "{} cached, {} copied, {} enhanced ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            ),
        }
    }
}
