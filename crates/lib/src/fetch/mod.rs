//! Source retrieval and verification.
//!
//! A [`Fetcher`] obtains the archive a recipe points at, checks it against the
//! recipe's sha256, and extracts it into a working directory. Nothing is
//! extracted or cached unless the digest matches.

pub mod archive;
pub mod download;

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::recipe::Sha256Digest;

pub use archive::{ArchiveKind, unpack_archive};
pub use download::ArchiveFetcher;

/// Errors raised while fetching, verifying or extracting a source archive.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The archive could not be retrieved. May succeed on retry.
  #[error("fetch failed for {url}: {message}")]
  Network { url: String, message: String },

  /// The archive was retrieved but its digest differs from the recipe's.
  #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
  ChecksumMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  #[error("unsupported archive format: {0}")]
  UnsupportedArchive(String),

  #[error("failed to extract {path}: {message}")]
  Extract { path: PathBuf, message: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl FetchError {
  /// Whether a retry could plausibly succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, FetchError::Network { .. })
  }
}

/// Retrieves, verifies and extracts source archives.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
  /// Fetch `url`, verify it against `expected`, and extract it into
  /// `work_dir`. Returns the extracted source tree.
  async fn fetch_and_verify(&self, url: &Url, expected: &Sha256Digest, work_dir: &Path) -> Result<PathBuf, FetchError>;
}

impl<T: Fetcher> Fetcher for &T {
  async fn fetch_and_verify(&self, url: &Url, expected: &Sha256Digest, work_dir: &Path) -> Result<PathBuf, FetchError> {
    (**self).fetch_and_verify(url, expected, work_dir).await
  }
}
