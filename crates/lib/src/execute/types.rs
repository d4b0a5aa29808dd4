//! Types for recipe execution.
//!
//! Error, result and configuration types shared by the executor and the
//! step runner.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::consts::{EXIT_CANCELLED, EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, EXIT_PRE_STEP_FAILURE};
use crate::fetch::FetchError;
use crate::placeholder::PlaceholderError;
use crate::recipe::ValidationError;
use crate::resolve::UnresolvedDependencyError;

/// Errors from running an install plan. Step indices are 1-based.
#[derive(Debug, Error)]
pub enum RunError {
  /// A step exited unsuccessfully. `exit_code` is `None` when the process
  /// was terminated by a signal.
  #[error("step {step_index} ({program}) {}", describe_exit(*exit_code))]
  StepFailed {
    step_index: usize,
    program: String,
    exit_code: Option<i32>,
  },

  #[error("step {step_index} ({program}) could not be started")]
  Spawn {
    step_index: usize,
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("cancelled during step {step_index}")]
  Cancelled { step_index: usize },
}

fn describe_exit(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("failed with exit code {code}"),
    None => "was terminated by a signal".to_string(),
  }
}

/// Errors from a whole install.
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  UnresolvedDependency(#[from] UnresolvedDependencyError),

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("failed to build install plan")]
  Plan(#[from] PlaceholderError),

  #[error(transparent)]
  Run(#[from] RunError),

  #[error("cancelled before the build started")]
  Cancelled,

  #[error("{path} exists and is not a link; remove it so the install can be linked")]
  OptLinkBlocked { path: PathBuf },

  #[error("io error at {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl ExecuteError {
  /// Process exit code for this failure.
  ///
  /// A failing step propagates its own exit code; everything else maps to a
  /// fixed sentinel.
  pub fn exit_code(&self) -> i32 {
    match self {
      ExecuteError::Run(RunError::StepFailed {
        exit_code: Some(code), ..
      }) if *code != 0 => *code,
      ExecuteError::Run(RunError::Spawn { source, .. }) if source.kind() == ErrorKind::NotFound => EXIT_NOT_FOUND,
      ExecuteError::Run(RunError::Spawn { .. }) => EXIT_CANNOT_EXECUTE,
      ExecuteError::Run(RunError::Cancelled { .. }) | ExecuteError::Cancelled => EXIT_CANCELLED,
      _ => EXIT_PRE_STEP_FAILURE,
    }
  }

  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| ExecuteError::Io { path, source }
  }
}

/// Configuration for the executor.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Parent of the per-recipe working directories.
  pub work_root: PathBuf,

  /// Where `opt/<id>` links are written after a successful install.
  /// `None` disables linking.
  pub opt_dir: Option<PathBuf>,

  /// Extra attempts after a transient fetch failure.
  pub fetch_retries: u32,

  /// Delay between fetch attempts.
  pub retry_delay: Duration,

  /// Keep the working directory after a successful install.
  pub keep_work_dir: bool,
}

impl ExecuteConfig {
  pub fn new(work_root: impl Into<PathBuf>) -> Self {
    Self {
      work_root: work_root.into(),
      opt_dir: None,
      fetch_retries: 2,
      retry_delay: Duration::from_secs(2),
      keep_work_dir: false,
    }
  }
}

/// Summary of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
  pub id: String,
  pub install_prefix: PathBuf,
  pub source_dir: PathBuf,
  pub steps_run: usize,
  pub fetch_attempts: u32,
  #[serde(skip)]
  pub elapsed: Duration,
}
