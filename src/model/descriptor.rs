//! Remote model descriptors and weight download.

use super::Normalization;
use crate::constants::{INPUT_CHANNELS, download};
use crate::error::{Error, Result};
use futures_util::StreamExt;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Metadata describing pre-trained classifier weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name.
    pub name: String,
    /// Input shape as `[height, width, channels]`.
    pub input_shape: Vec<usize>,
    /// Number of output classes.
    pub num_classes: usize,
    /// Pixel normalization expected by the weights.
    #[serde(default)]
    pub normalization: Normalization,
    /// ONNX weights, relative to the descriptor or absolute.
    pub weights: String,
    /// Optional SHA-256 of the weights file.
    #[serde(default)]
    pub sha256: Option<String>,
    /// Optional published accuracy.
    #[serde(default)]
    pub accuracy: Option<f32>,
}

impl ModelDescriptor {
    /// Square input edge, if the shape is `[edge, edge, 3]`.
    pub fn input_edge(&self) -> std::result::Result<u32, String> {
        match self.input_shape.as_slice() {
            &[h, w, c] if h == w && c == INPUT_CHANNELS && h > 0 => {
                u32::try_from(h).map_err(|_| format!("input edge {h} is too large"))
            }
            shape => Err(format!(
                "unsupported input shape {shape:?}, expected [edge, edge, {INPUT_CHANNELS}]"
            )),
        }
    }
}

/// Where a descriptor or weights file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local filesystem path.
    Local(PathBuf),
    /// HTTP(S) URL.
    Remote(Url),
}

impl Location {
    /// Interpret `s` as a URL when it has an http(s) scheme, else a path.
    pub fn parse(s: &str) -> Result<Self> {
        if s.starts_with("http://") || s.starts_with("https://") {
            Url::parse(s)
                .map(Self::Remote)
                .map_err(|e| Error::DescriptorRead {
                    location: s.to_string(),
                    source: Box::new(e),
                })
        } else {
            Ok(Self::Local(PathBuf::from(s)))
        }
    }

    /// Resolve `reference` relative to this location.
    pub fn join(&self, reference: &str) -> Result<Self> {
        let absolute = Self::parse(reference)?;
        match (self, absolute) {
            (_, remote @ Self::Remote(_)) => Ok(remote),
            (_, Self::Local(path)) if path.is_absolute() => Ok(Self::Local(path)),
            (Self::Local(base), Self::Local(path)) => Ok(Self::Local(
                base.parent().unwrap_or_else(|| Path::new("")).join(path),
            )),
            (Self::Remote(base), Self::Local(_)) => {
                base.join(reference)
                    .map(Self::Remote)
                    .map_err(|e| Error::DescriptorRead {
                        location: reference.to_string(),
                        source: Box::new(e),
                    })
            }
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Build the HTTP client used for descriptor and weight downloads.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(std::time::Duration::from_secs(download::CONNECT_TIMEOUT_SECS))
        .timeout(std::time::Duration::from_secs(download::REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

/// Read and parse a descriptor.
pub async fn fetch_descriptor(client: &Client, location: &Location) -> Result<ModelDescriptor> {
    let read_err = |source: Box<dyn std::error::Error + Send + Sync>| Error::DescriptorRead {
        location: location.to_string(),
        source,
    };

    let body = match location {
        Location::Local(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| read_err(Box::new(e)))?,
        Location::Remote(url) => {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| read_err(Box::new(e)))?;
            if !response.status().is_success() {
                return Err(read_err(format!("HTTP {}", response.status()).into()));
            }
            response.text().await.map_err(|e| read_err(Box::new(e)))?
        }
    };

    serde_json::from_str(&body).map_err(|source| Error::DescriptorParse {
        location: location.to_string(),
        source,
    })
}

/// Make the weights available as a local file, verifying the checksum.
///
/// Remote weights are downloaded into `cache_dir` unless a file with the
/// expected checksum is already there.
pub async fn materialize_weights(
    client: &Client,
    weights: &Location,
    cache_dir: &Path,
    sha256: Option<&str>,
) -> Result<PathBuf> {
    let path = match weights {
        Location::Local(path) => path.clone(),
        Location::Remote(url) => {
            let file_name = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|name| !name.is_empty())
                .unwrap_or("model.onnx");
            let dest = cache_dir.join(file_name);

            let cached = match sha256 {
                Some(expected) if dest.exists() => verify_checksum(&dest, expected).await.is_ok(),
                _ => false,
            };
            if cached {
                debug!("Using cached weights at {}", dest.display());
            } else {
                tokio::fs::create_dir_all(cache_dir).await?;
                download_file(client, url, &dest).await?;
            }
            dest
        }
    };

    if let Some(expected) = sha256 {
        verify_checksum(&path, expected).await?;
    }
    Ok(path)
}

/// Stream `url` into `dest`.
pub async fn download_file(client: &Client, url: &Url, dest: &Path) -> Result<()> {
    let failed = |source: Box<dyn std::error::Error + Send + Sync>| Error::DownloadFailed {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| failed(Box::new(e)))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status()).into()));
    }

    info!("Downloading {url}");
    let mut file = File::create(dest).await.map_err(Error::Io)?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| failed(Box::new(e)))?;
        file.write_all(&chunk).await.map_err(Error::Io)?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await.map_err(Error::Io)?;

    debug!("Downloaded {downloaded} bytes to {}", dest.display());
    Ok(())
}

/// Compare a file's SHA-256 with `expected` (hex, case-insensitive).
pub async fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let actual = sha256_hex(&bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DESCRIPTOR: &str = r#"{
        "name": "wildlife-efficientnet",
        "input_shape": [224, 224, 3],
        "num_classes": 10,
        "normalization": "minus_one_to_one",
        "weights": "weights/model.onnx",
        "accuracy": 0.91
    }"#;

    #[test]
    fn test_descriptor_fields() {
        let d: ModelDescriptor = serde_json::from_str(DESCRIPTOR).unwrap();
        assert_eq!(d.input_edge().unwrap(), 224);
        assert_eq!(d.normalization, Normalization::MinusOneToOne);
        assert!(d.sha256.is_none());
    }

    #[test]
    fn test_non_square_input_is_rejected() {
        let mut d: ModelDescriptor = serde_json::from_str(DESCRIPTOR).unwrap();
        d.input_shape = vec![224, 112, 3];
        assert!(d.input_edge().is_err());
        d.input_shape = vec![224, 224];
        assert!(d.input_edge().is_err());
    }

    #[test]
    fn test_relative_weights_resolve_next_to_descriptor() {
        let base = Location::parse("/models/wild/descriptor.json").unwrap();
        assert_eq!(
            base.join("model.onnx").unwrap(),
            Location::Local(PathBuf::from("/models/wild/model.onnx"))
        );

        let remote = Location::parse("https://example.org/models/descriptor.json").unwrap();
        assert_eq!(
            remote.join("model.onnx").unwrap().to_string(),
            "https://example.org/models/model.onnx"
        );
    }

    #[tokio::test]
    async fn test_fetch_local_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("descriptor.json");
        std::fs::write(&path, DESCRIPTOR).unwrap();
        let client = http_client().unwrap();
        let d = fetch_descriptor(&client, &Location::Local(path)).await.unwrap();
        assert_eq!(d.name, "wildlife-efficientnet");
    }

    #[tokio::test]
    async fn test_fetch_malformed_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("descriptor.json");
        std::fs::write(&path, "{\"name\": 3}").unwrap();
        let client = http_client().unwrap();
        let result = fetch_descriptor(&client, &Location::Local(path)).await;
        assert!(matches!(result, Err(Error::DescriptorParse { .. })));
    }

    #[tokio::test]
    async fn test_checksum_verification() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.onnx");
        std::fs::write(&path, b"abc").unwrap();
        let good = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        verify_checksum(&path, good).await.unwrap();
        verify_checksum(&path, &good.to_uppercase()).await.unwrap();

        let result = verify_checksum(&path, "00").await;
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }
}
