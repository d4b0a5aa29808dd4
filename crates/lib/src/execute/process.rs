//! Launching steps as real child processes.
//!
//! The child inherits the environment and the standard streams of the
//! invoking process, so build output appears as it is produced.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::execute::runner::{LaunchError, Launcher};
use crate::plan::BuildStep;

/// [`Launcher`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
  pub fn new() -> Self {
    Self
  }
}

/// `./configure` means the configure script in the step's working
/// directory, not in the directory the executor was started from.
fn program_path(program: &str, cwd: &Path) -> PathBuf {
  let path = Path::new(program);
  if path.is_relative() && path.components().count() > 1 {
    cwd.join(path)
  } else {
    path.to_path_buf()
  }
}

impl Launcher for ProcessLauncher {
  async fn launch(&self, step: &BuildStep, cwd: &Path, cancel: &CancellationToken) -> Result<Option<i32>, LaunchError> {
    let program = program_path(&step.program, cwd);

    let mut command = Command::new(&program);
    command
      .args(&step.args)
      .envs(&step.env)
      .current_dir(cwd)
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .kill_on_drop(true);

    debug!(program = %program.display(), cwd = %cwd.display(), "spawning process");

    let mut child = command.spawn().map_err(LaunchError::Spawn)?;

    tokio::select! {
      status = child.wait() => {
        let status = status.map_err(LaunchError::Spawn)?;
        debug!(status = %status, "process exited");
        Ok(status.code())
      }
      _ = cancel.cancelled() => {
        warn!(program = %step.program, "cancelling running step");
        if let Err(e) = child.kill().await {
          warn!(error = %e, "failed to kill child process");
        }
        Err(LaunchError::Cancelled)
      }
    }
  }
}
