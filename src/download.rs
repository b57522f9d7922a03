//! Source tarball downloads
//!
//! Streams release archives to disk in bounded chunks. A download is written to
//! a temporary file next to the destination and only renamed into place once
//! the whole body arrived (and matched its checksum, when one is known), so a
//! failed fetch never leaves a partial archive behind.

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Default HTTP timeout for a whole archive download.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} downloading {url}")]
    Status { url: String, status: u16 },

    #[error("Network error downloading {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to write {path} while downloading {url}: {source}")]
    Io {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// HTTP status code, when the server answered with a non-success status.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Wrap an IO error with URL and path context for use in `map_err`
    fn wrap_io(url: &str, path: &Path) -> impl Fn(std::io::Error) -> Self {
        let url = url.to_string();
        let path = path.to_path_buf();
        move |source| Self::Io {
            url: url.clone(),
            path: path.clone(),
            source,
        }
    }

    /// Wrap a network error with URL context for use in `map_err`
    fn wrap_transport(url: &str) -> impl Fn(reqwest::Error) -> Self {
        let url = url.to_string();
        move |source| Self::Transport {
            url: url.clone(),
            source,
        }
    }
}

/// Downloads source archives over HTTP(S).
#[derive(Clone)]
pub struct TarballFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for TarballFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarballFetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TarballFetcher {
    /// Create a fetcher with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("jqdeps/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Download `url` to `destination`, replacing any existing file.
    ///
    /// Only a `200 OK` answer counts as success. When `expected_sha256` is
    /// given the archive is verified before it is moved into place.
    ///
    /// Returns the lowercase hex SHA-256 of the downloaded archive.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for any non-200 answer,
    /// [`FetchError::Transport`] for connection or body failures,
    /// [`FetchError::ChecksumMismatch`] when verification fails, and
    /// [`FetchError::Io`] when the file cannot be written.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<String, FetchError> {
        info!(url = %url, "downloading");

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(FetchError::wrap_io(url, parent))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::wrap_transport(url))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Stream to a temporary file in the destination directory
        let temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(FetchError::wrap_io(url, parent))?;
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;

        {
            let file_std = temp_file
                .as_file()
                .try_clone()
                .map_err(FetchError::wrap_io(url, temp_file.path()))?;
            let mut file = tokio::fs::File::from_std(file_std);

            let mut stream = response.bytes_stream();
            while let Some(chunk_result) = stream.next().await {
                let chunk = chunk_result.map_err(FetchError::wrap_transport(url))?;
                hasher.update(&chunk);
                written += chunk.len() as u64;
                file.write_all(&chunk)
                    .await
                    .map_err(FetchError::wrap_io(url, temp_file.path()))?;
            }

            file.flush()
                .await
                .map_err(FetchError::wrap_io(url, temp_file.path()))?;
        } // File is closed here

        let actual = format!("{:x}", hasher.finalize());
        if let Some(expected) = expected_sha256
            && !expected.eq_ignore_ascii_case(&actual)
        {
            return Err(FetchError::ChecksumMismatch {
                url: url.to_string(),
                expected: expected.to_lowercase(),
                actual,
            });
        }

        // Atomic rename over whatever was there before
        temp_file
            .persist(destination)
            .map_err(|e| FetchError::Io {
                url: url.to_string(),
                path: destination.to_path_buf(),
                source: e.error,
            })?;

        debug!(path = %destination.display(), bytes = written, sha256 = %actual, "download complete");
        info!(url = %url, "downloaded");

        Ok(actual)
    }

    /// Configured request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Compute the SHA-256 checksum of a file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_checksum(path: &Path) -> std::io::Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(buffer.get(..count).unwrap_or(&[]));
    }

    Ok(format!("{:x}", hasher.finalize()))
}
