//! Step runner.
//!
//! Runs an install plan one step at a time. The first step that fails stops
//! the run; nothing after it is launched and nothing before it is undone.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::execute::types::RunError;
use crate::plan::{BuildStep, InstallPlan};

/// Why a launch did not produce an exit status.
#[derive(Debug)]
pub enum LaunchError {
  Spawn(std::io::Error),
  Cancelled,
}

/// Launches one external process and waits for it.
#[allow(async_fn_in_trait)]
pub trait Launcher {
  /// Run `step` in `cwd` and return its exit code, or `None` if it was
  /// terminated by a signal.
  async fn launch(&self, step: &BuildStep, cwd: &Path, cancel: &CancellationToken) -> Result<Option<i32>, LaunchError>;
}

impl<T: Launcher> Launcher for &T {
  async fn launch(&self, step: &BuildStep, cwd: &Path, cancel: &CancellationToken) -> Result<Option<i32>, LaunchError> {
    (**self).launch(step, cwd, cancel).await
  }
}

/// Execute every step of `plan` in order inside `working_dir`.
///
/// Returns the number of steps run.
pub async fn run_plan(
  plan: &InstallPlan,
  working_dir: &Path,
  launcher: &impl Launcher,
  cancel: &CancellationToken,
) -> Result<usize, RunError> {
  let total = plan.len();

  for (index, step) in plan.steps().iter().enumerate() {
    let step_index = index + 1;
    if cancel.is_cancelled() {
      return Err(RunError::Cancelled { step_index });
    }

    info!(step = step_index, total, cmd = %step, "running step");

    let exit_code = match launcher.launch(step, working_dir, cancel).await {
      Ok(code) => code,
      Err(LaunchError::Cancelled) => return Err(RunError::Cancelled { step_index }),
      Err(LaunchError::Spawn(source)) => {
        error!(step = step_index, program = %step.program, error = %source, "failed to start step");
        return Err(RunError::Spawn {
          step_index,
          program: step.program.clone(),
          source,
        });
      }
    };

    if exit_code != Some(0) {
      error!(step = step_index, program = %step.program, code = ?exit_code, "step failed");
      return Err(RunError::StepFailed {
        step_index,
        program: step.program.clone(),
        exit_code,
      });
    }
  }

  Ok(total)
}
