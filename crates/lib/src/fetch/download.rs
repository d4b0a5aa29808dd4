//! Default [`Fetcher`]: download with a verified cache, then extract.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::fetch::{ArchiveKind, FetchError, Fetcher, unpack_archive};
use crate::recipe::Sha256Digest;
use crate::util::hash::{hash_file, sha256_hex};

/// Downloads archives over http(s) or reads `file://` URLs, keeping verified
/// copies in `downloads_dir`.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
  downloads_dir: PathBuf,
  client: reqwest::Client,
}

impl ArchiveFetcher {
  pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
    Self {
      downloads_dir: downloads_dir.into(),
      client: reqwest::Client::new(),
    }
  }

  /// Return a local, verified copy of the archive.
  async fn download(&self, url: &Url, expected: &Sha256Digest) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(&self.downloads_dir).await?;
    let dest_path = self.downloads_dir.join(url_to_filename(url));

    if fs::try_exists(&dest_path).await? {
      match hash_file(&dest_path).await {
        Ok(actual) if expected.matches(&actual) => {
          info!(path = %dest_path.display(), "using cached archive");
          return Ok(dest_path);
        }
        Ok(actual) => debug!(expected = %expected, actual = %actual, "cached archive hash mismatch, re-fetching"),
        Err(e) => debug!(error = %e, "cached archive unreadable, re-fetching"),
      }
    }

    info!(url = %url, "fetching source");
    let bytes = self.retrieve(url).await?;

    let actual = sha256_hex(&bytes);
    if !expected.matches(&actual) {
      return Err(FetchError::ChecksumMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual,
      });
    }
    debug!(sha256 = %actual, "checksum verified");

    let partial = dest_path.with_extension("part");
    let mut file = fs::File::create(&partial).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);
    fs::rename(&partial, &dest_path).await?;

    info!(path = %dest_path.display(), size = bytes.len(), "download complete");
    Ok(dest_path)
  }

  async fn retrieve(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
    let network = |message: String| FetchError::Network {
      url: url.to_string(),
      message,
    };

    if url.scheme() == "file" {
      let path = url
        .to_file_path()
        .map_err(|_| network("not a local file path".to_string()))?;
      return fs::read(&path).await.map_err(|e| network(e.to_string()));
    }

    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| network(e.to_string()))?;

    if !response.status().is_success() {
      return Err(network(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| network(e.to_string()))?;
    Ok(bytes.to_vec())
  }
}

impl Fetcher for ArchiveFetcher {
  async fn fetch_and_verify(&self, url: &Url, expected: &Sha256Digest, work_dir: &Path) -> Result<PathBuf, FetchError> {
    let filename = url_to_filename(url);
    if ArchiveKind::detect(&filename).is_none() {
      return Err(FetchError::UnsupportedArchive(filename));
    }

    let archive = self.download(url, expected).await?;

    let dest = work_dir.to_path_buf();
    let unpack_dest = dest.clone();
    tokio::task::spawn_blocking(move || unpack_archive(&archive, &unpack_dest))
      .await
      .map_err(|e| FetchError::Io(std::io::Error::other(e)))??;

    Ok(dest)
  }
}

/// Derive a safe cache filename from the last URL path segment.
///
/// Falls back to a hash of the URL when the path has no usable segment.
fn url_to_filename(url: &Url) -> String {
  let segment = url
    .path_segments()
    .and_then(|mut segments| segments.next_back())
    .unwrap_or_default();

  let sanitized: String = segment
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect();

  if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
    return sanitized;
  }

  format!("download_{}", &sha256_hex(url.as_str().as_bytes())[..16])
}
