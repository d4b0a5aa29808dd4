//! Shared test helpers for CLI integration tests.

use std::io::Write;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

/// Isolated test environment with its own root, cache and config dirs.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  fn dir(&self, name: &str) -> PathBuf {
    let p = self.temp.path().join(name);
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn root_path(&self) -> PathBuf {
    self.dir("root")
  }

  pub fn cache_path(&self) -> PathBuf {
    self.dir("cache")
  }

  /// Build `<name>.tar.gz` whose entries sit under a `<name>/` directory.
  /// Returns its `file://` URL and sha256.
  pub fn source_archive(&self, name: &str, files: &[(&str, &str)]) -> (String, String) {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in files {
      let mut header = tar::Header::new_gnu();
      header.set_size(content.len() as u64);
      header.set_mode(0o755);
      header.set_cksum();
      builder
        .append_data(&mut header, format!("{name}/{path}"), content.as_bytes())
        .unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar).unwrap();
    let bytes = encoder.finish().unwrap();

    let path = self.dir("sources").join(format!("{name}.tar.gz"));
    std::fs::write(&path, &bytes).unwrap();
    let sha256 = hex::encode(Sha256::digest(&bytes));
    (format!("file://{}", path.display()), sha256)
  }

  /// Write a recipe file and return its path.
  pub fn write_recipe(&self, content: &str) -> PathBuf {
    let path = self.temp.path().join("recipe.toml");
    std::fs::write(&path, content).unwrap();
    path
  }

  /// A kiln command with `KILN_ROOT`, `KILN_CACHE` and `XDG_CONFIG_HOME`
  /// pointing into the temp directory.
  pub fn kiln_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("kiln");
    cmd.env("KILN_ROOT", self.root_path());
    cmd.env("KILN_CACHE", self.cache_path());
    cmd.env("XDG_CONFIG_HOME", self.dir("config"));
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
