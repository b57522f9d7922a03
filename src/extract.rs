//! Source archive extraction
//!
//! Unpacks a `.tar.gz` release into the dependency working area. Extraction
//! replaces: an existing tree with the expected name is removed first, never
//! merged into.

use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Malformed archive {archive}: {source}")]
    Malformed {
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extracting {archive} did not produce {expected}")]
    MissingDirectory { archive: PathBuf, expected: PathBuf },

    #[error("Failed to prepare {path} for extraction: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Remove a file or directory tree if it exists.
///
/// # Errors
///
/// Returns the underlying IO error for anything other than "not found".
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Unpacks gzip-compressed tarballs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Create an extractor
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Extract `archive` into `destination_parent`, expecting it to produce
    /// `destination_parent/expected_dir_name`.
    ///
    /// Returns the path of the extracted directory.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Malformed`] for corrupt or truncated
    /// archives, [`ExtractionError::MissingDirectory`] when the archive does
    /// not contain `expected_dir_name`, and [`ExtractionError::Io`] when stale
    /// state cannot be removed.
    pub fn extract(
        &self,
        archive: &Path,
        destination_parent: &Path,
        expected_dir_name: &str,
    ) -> Result<PathBuf, ExtractionError> {
        let expected = destination_parent.join(expected_dir_name);

        remove_path(&expected).map_err(|source| ExtractionError::Io {
            path: expected.clone(),
            source,
        })?;
        fs::create_dir_all(destination_parent).map_err(|source| ExtractionError::Io {
            path: destination_parent.to_path_buf(),
            source,
        })?;

        info!(
            archive = %archive.display(),
            destination = %destination_parent.display(),
            "extracting"
        );

        let file = fs::File::open(archive).map_err(|source| ExtractionError::Io {
            path: archive.to_path_buf(),
            source,
        })?;

        let mut tarball = Archive::new(GzDecoder::new(file));
        if let Err(source) = tarball.unpack(destination_parent) {
            // Leave no half-extracted tree behind
            if let Err(e) = remove_path(&expected) {
                warn!(path = %expected.display(), error = %e, "failed to clean up partial extraction");
            }
            return Err(ExtractionError::Malformed {
                archive: archive.to_path_buf(),
                source,
            });
        }

        if !expected.is_dir() {
            return Err(ExtractionError::MissingDirectory {
                archive: archive.to_path_buf(),
                expected,
            });
        }

        debug!(path = %expected.display(), "extracted");
        Ok(expected)
    }
}
