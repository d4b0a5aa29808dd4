//! Implementation of the `kiln install` command.

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use kiln_lib::config::Settings;
use kiln_lib::execute::{Executor, ProcessLauncher};
use kiln_lib::fetch::ArchiveFetcher;
use kiln_lib::recipe::RecipeDescriptor;

use crate::output::{format_duration, print_stat, print_success};

/// Install the recipe at `path`.
///
/// Errors from the executor are returned unwrapped so the caller can map them
/// to the process exit code.
pub async fn cmd_install(
  path: &Path,
  prefix: Option<&Path>,
  settings: &Settings,
  cancel: CancellationToken,
) -> Result<()> {
  let recipe = RecipeDescriptor::load(path).with_context(|| format!("Invalid recipe: {}", path.display()))?;
  let install_prefix = settings.install_prefix(&recipe, prefix)?;

  let executor = Executor::new(
    settings.resolver(),
    ArchiveFetcher::new(settings.downloads_dir()),
    ProcessLauncher::new(),
    settings.execute_config(),
  )
  .with_cancellation(cancel);

  let report = executor.install(&recipe, &install_prefix).await?;

  print_success(&format!("Installed {}", report.id));
  print_stat("Prefix", &report.install_prefix.display().to_string());
  print_stat("Steps", &report.steps_run.to_string());
  if report.fetch_attempts > 1 {
    print_stat("Fetch attempts", &report.fetch_attempts.to_string());
  }
  print_stat("Time", &format_duration(report.elapsed));
  Ok(())
}
