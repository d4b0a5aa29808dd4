//! SHA-256 helpers for source verification.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Lowercase hex sha256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

/// Lowercase hex sha256 of a file, read in chunks.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
  let mut file = File::open(path).await?;
  let mut hasher = Sha256::new();
  let mut buffer = vec![0u8; 64 * 1024];

  loop {
    let read = file.read(&mut buffer).await?;
    if read == 0 {
      break;
    }
    hasher.update(&buffer[..read]);
  }

  Ok(hex::encode(hasher.finalize()))
}
