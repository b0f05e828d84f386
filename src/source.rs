//! Source image references and the loaders that resolve them to bytes.
//!
//! A [`SourceRef`] is the caller's locator string, kept verbatim. The engine
//! hands that exact string back when it falls back to the original image, so
//! "the original" is always byte-identical to what came in.
//!
//! Three kinds of locator are understood:
//!
//! | Form | Resolved by |
//! |---|---|
//! | `data:image/png;base64,...` | inline base64 (or percent-encoded) payload |
//! | `http://` / `https://` | `reqwest` GET with timeout and size cap |
//! | anything else, `file://` optional | `tokio::fs::read` |
//!
//! [`SourceLoader`] is the seam the engine talks to. [`DefaultLoader`] is the
//! production implementation; tests swap in a recording mock.

use crate::config::FetchConfig;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("Source too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("Malformed data URI: {0}")]
    InvalidDataUri(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// What a [`SourceRef`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind<'a> {
    Data(&'a str),
    Remote(&'a str),
    File(&'a Path),
}

/// Locator for a source image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Wrap freshly uploaded bytes as a self-contained `data:` reference.
    pub fn from_upload(bytes: &[u8], mime: &str) -> Self {
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> SourceKind<'_> {
        let s = self.0.as_str();
        if s.starts_with("data:") {
            SourceKind::Data(s)
        } else if s.starts_with("http://") || s.starts_with("https://") {
            SourceKind::Remote(s)
        } else {
            SourceKind::File(Path::new(s.strip_prefix("file://").unwrap_or(s)))
        }
    }

    /// Short form for logs; data URIs can be megabytes long.
    pub fn display_short(&self) -> String {
        match self.kind() {
            SourceKind::Data(s) => {
                let header = s.split(',').next().unwrap_or("data:");
                format!("{header},… ({} bytes)", s.len())
            }
            _ => self.0.clone(),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Decode the payload of a `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, SourceError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| SourceError::InvalidDataUri("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SourceError::InvalidDataUri("missing ',' separator".into()))?;
    if header.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        Ok(STANDARD.decode(compact)?)
    } else {
        Ok(percent_encoding::percent_decode_str(payload).collect())
    }
}

/// Resolves a [`SourceRef`] to raw encoded bytes.
///
/// Implementations must always resolve: a hung load would leave the engine
/// in `Processing` forever.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn load(&self, source: &SourceRef) -> Result<Vec<u8>, SourceError>;
}

/// Production loader: files, data URIs, and HTTP(S).
pub struct DefaultLoader {
    client: reqwest::Client,
    max_bytes: usize,
}

impl DefaultLoader {
    pub fn new(config: &FetchConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }

    fn check_size(&self, size: usize) -> Result<(), SourceError> {
        if size > self.max_bytes {
            return Err(SourceError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }
        // Content-Length may be absent, so the cap also applies while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            self.check_size(body.len())?;
        }
        Ok(body)
    }
}

#[async_trait]
impl SourceLoader for DefaultLoader {
    async fn load(&self, source: &SourceRef) -> Result<Vec<u8>, SourceError> {
        let bytes = match source.kind() {
            SourceKind::Data(uri) => decode_data_uri(uri)?,
            SourceKind::Remote(url) => {
                tracing::debug!(url = %url, "Fetching remote source");
                self.fetch(url).await?
            }
            SourceKind::File(path) => {
                tracing::trace!(path = %path.display(), "Reading source from filesystem");
                tokio::fs::read(path).await.map_err(|source| SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        self.check_size(bytes.len())?;
        Ok(bytes)
    }
}
