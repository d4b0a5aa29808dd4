//! Test doubles and fixtures for kiln-lib.
//!
//! Fake launchers and fetchers let tests count process launches and fetch
//! attempts without spawning anything or touching the network.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::execute::{LaunchError, Launcher};
use crate::fetch::{FetchError, Fetcher};
use crate::plan::BuildStep;
use crate::recipe::{RecipeDef, RecipeDescriptor, Sha256Digest, StepTemplate};

pub const GRUB_SHA256: &str = "810b3798d316394f94096ec2797909dbf23c858e48f7b3830826b8daa06b7b0f";

/// The cross-targeted GRUB recipe used throughout the tests.
pub fn grub_def() -> RecipeDef {
  RecipeDef {
    id: "grub".to_string(),
    description: "GNU GRUB 2 targetting i386-elf".to_string(),
    homepage: "https://www.gnu.org/software/grub/".to_string(),
    url: "https://ftp.gnu.org/gnu/grub/grub-2.02.tar.xz".to_string(),
    sha256: GRUB_SHA256.to_string(),
    version: None,
    depends_on: vec!["i386-elf-gcc".to_string(), "xorriso".to_string()],
    install: vec![
      StepTemplate::new(
        "./configure",
        &[
          "--disable-werror",
          "--target=i386-elf",
          "--prefix=$${prefix}",
          "TARGET_CC=$${dep:i386-elf-gcc}/bin/i386-elf-gcc",
          "TARGET_OBJCOPY=$${dep:i386-elf-gcc}/bin/i386-elf-objcopy",
          "TARGET_STRIP=$${dep:i386-elf-gcc}/bin/i386-elf-strip",
          "TARGET_NM=$${dep:i386-elf-gcc}/bin/i386-elf-nm",
          "TARGET_RANLIB=$${dep:i386-elf-gcc}/bin/i386-elf-ranlib",
        ],
      ),
      StepTemplate::new("make", &[]),
      StepTemplate::new("make", &["install"]),
    ],
  }
}

pub fn grub_recipe() -> RecipeDescriptor {
  RecipeDescriptor::new(grub_def()).unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
  Exit(i32),
  Signal,
  SpawnError,
}

/// Records every launch instead of spawning a process.
///
/// By default every step exits 0; `fail_at`, `signal_at` and
/// `spawn_error_at` change the outcome of one 1-based step.
#[derive(Default)]
pub struct RecordingLauncher {
  launched: RefCell<Vec<(BuildStep, PathBuf)>>,
  scripted: Option<(usize, Outcome)>,
}

impl RecordingLauncher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_at(mut self, step: usize, code: i32) -> Self {
    self.scripted = Some((step, Outcome::Exit(code)));
    self
  }

  pub fn signal_at(mut self, step: usize) -> Self {
    self.scripted = Some((step, Outcome::Signal));
    self
  }

  pub fn spawn_error_at(mut self, step: usize) -> Self {
    self.scripted = Some((step, Outcome::SpawnError));
    self
  }

  pub fn count(&self) -> usize {
    self.launched.borrow().len()
  }

  pub fn launched(&self) -> Vec<BuildStep> {
    self.launched.borrow().iter().map(|(step, _)| step.clone()).collect()
  }

  pub fn cwds(&self) -> Vec<PathBuf> {
    self.launched.borrow().iter().map(|(_, cwd)| cwd.clone()).collect()
  }
}

impl Launcher for RecordingLauncher {
  async fn launch(&self, step: &BuildStep, cwd: &Path, _cancel: &CancellationToken) -> Result<Option<i32>, LaunchError> {
    self.launched.borrow_mut().push((step.clone(), cwd.to_path_buf()));
    let index = self.count();

    match self.scripted {
      Some((at, Outcome::Exit(code))) if at == index => Ok(Some(code)),
      Some((at, Outcome::Signal)) if at == index => Ok(None),
      Some((at, Outcome::SpawnError)) if at == index => Err(LaunchError::Spawn(std::io::Error::from(
        std::io::ErrorKind::NotFound,
      ))),
      _ => Ok(Some(0)),
    }
  }
}

/// Scripted result for [`StubFetcher`].
#[derive(Debug, Clone, Copy)]
pub enum FetchBehavior {
  /// Succeed, returning the work dir as the source tree.
  Succeed,
  /// Report a checksum mismatch.
  Mismatch,
  /// Fail with a network error this many times, then succeed.
  NetworkFailures(u32),
  /// Never complete.
  Pending,
}

pub struct StubFetcher {
  behavior: FetchBehavior,
  calls: Cell<u32>,
}

impl StubFetcher {
  pub fn new(behavior: FetchBehavior) -> Self {
    Self {
      behavior,
      calls: Cell::new(0),
    }
  }

  pub fn calls(&self) -> u32 {
    self.calls.get()
  }
}

impl Fetcher for StubFetcher {
  async fn fetch_and_verify(&self, url: &Url, expected: &Sha256Digest, work_dir: &Path) -> Result<PathBuf, FetchError> {
    self.calls.set(self.calls.get() + 1);

    match self.behavior {
      FetchBehavior::Succeed => Ok(work_dir.to_path_buf()),
      FetchBehavior::Mismatch => Err(FetchError::ChecksumMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual: "0".repeat(64),
      }),
      FetchBehavior::NetworkFailures(n) if self.calls.get() <= n => Err(FetchError::Network {
        url: url.to_string(),
        message: "connection reset".to_string(),
      }),
      FetchBehavior::NetworkFailures(_) => Ok(work_dir.to_path_buf()),
      FetchBehavior::Pending => std::future::pending().await,
    }
  }
}

/// A step that runs `script` through the platform shell.
#[cfg(unix)]
pub fn shell_step(script: &str) -> BuildStep {
  BuildStep::new("/bin/sh", &["-c", script])
}

#[cfg(windows)]
pub fn shell_step(script: &str) -> BuildStep {
  BuildStep::new("cmd.exe", &["/C", script])
}

/// A step that creates an empty file in its working directory.
#[cfg(unix)]
pub fn touch_step(filename: &str) -> BuildStep {
  BuildStep::new("touch", &[filename])
}

#[cfg(windows)]
pub fn touch_step(filename: &str) -> BuildStep {
  BuildStep::new(
    "powershell.exe",
    &[
      "-NoProfile",
      "-Command",
      &format!("New-Item -ItemType File -Path '{}' -Force | Out-Null", filename),
    ],
  )
}
