//! Recipe execution.
//!
//! The [`Executor`] drives one install from a validated recipe:
//! - resolves declared dependencies to installed prefixes
//! - fetches, verifies and extracts the source archive
//! - builds the install plan
//! - runs the plan step by step, stopping at the first failure
//!
//! Every stage is strictly sequential. A failure in one stage means no later
//! stage starts; in particular a checksum mismatch launches no process.

pub mod process;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fetch::Fetcher;
use crate::plan::{InstallPlan, build_plan};
use crate::recipe::RecipeDescriptor;
use crate::resolve::{DependencyResolver, ResolvedDeps};

pub use process::ProcessLauncher;
pub use runner::{LaunchError, Launcher, run_plan};
pub use types::{ExecuteConfig, ExecuteError, InstallReport, RunError};

/// Runs recipes against injected resolver, fetcher and launcher.
pub struct Executor<R, F, L> {
  resolver: R,
  fetcher: F,
  launcher: L,
  config: ExecuteConfig,
  cancel: CancellationToken,
}

impl<R, F, L> Executor<R, F, L>
where
  R: DependencyResolver,
  F: Fetcher,
  L: Launcher,
{
  pub fn new(resolver: R, fetcher: F, launcher: L, config: ExecuteConfig) -> Self {
    Self {
      resolver,
      fetcher,
      launcher,
      config,
      cancel: CancellationToken::new(),
    }
  }

  /// Use `cancel` to abort an install in progress.
  pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn config(&self) -> &ExecuteConfig {
    &self.config
  }

  /// Working directory used for `recipe`.
  pub fn work_dir(&self, recipe: &RecipeDescriptor) -> PathBuf {
    self.config.work_root.join(recipe.id())
  }

  /// Resolve dependencies and build the plan without fetching or running.
  pub fn plan(&self, recipe: &RecipeDescriptor, install_prefix: &Path) -> Result<(ResolvedDeps, InstallPlan), ExecuteError> {
    let resolved = self.resolver.resolve(recipe.depends_on())?;
    let plan = build_plan(recipe, &resolved, install_prefix, &self.work_dir(recipe))?;
    Ok((resolved, plan))
  }

  /// Fetch, build and install `recipe` into `install_prefix`.
  pub async fn install(&self, recipe: &RecipeDescriptor, install_prefix: &Path) -> Result<InstallReport, ExecuteError> {
    let started = Instant::now();
    info!(id = %recipe.id(), prefix = %install_prefix.display(), "installing");

    let resolved = self.resolver.resolve(recipe.depends_on())?;
    if let Some(opt_dir) = &self.config.opt_dir {
      check_opt_link(&opt_dir.join(recipe.id())).await?;
    }

    let work_dir = self.work_dir(recipe);
    prepare_work_dir(&work_dir).await?;

    let (source_dir, fetch_attempts) = self.fetch_with_retries(recipe, &work_dir).await?;

    let plan = build_plan(recipe, &resolved, install_prefix, &source_dir)?;
    tokio::fs::create_dir_all(install_prefix)
      .await
      .map_err(ExecuteError::io(install_prefix))?;

    let steps_run = run_plan(&plan, &source_dir, &self.launcher, &self.cancel).await?;

    if let Some(opt_dir) = &self.config.opt_dir {
      link_opt(opt_dir, recipe.id(), install_prefix).await?;
    }

    if !self.config.keep_work_dir {
      if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
        warn!(path = %work_dir.display(), error = %e, "failed to remove working directory");
      }
    }

    let report = InstallReport {
      id: recipe.id().to_string(),
      install_prefix: install_prefix.to_path_buf(),
      source_dir,
      steps_run,
      fetch_attempts,
      elapsed: started.elapsed(),
    };
    info!(id = %report.id, steps = report.steps_run, elapsed_ms = report.elapsed.as_millis() as u64, "install complete");
    Ok(report)
  }

  async fn fetch_with_retries(&self, recipe: &RecipeDescriptor, work_dir: &Path) -> Result<(PathBuf, u32), ExecuteError> {
    let mut attempt = 0;

    loop {
      attempt += 1;
      let fetched = tokio::select! {
        result = self.fetcher.fetch_and_verify(recipe.url(), recipe.sha256(), work_dir) => result,
        _ = self.cancel.cancelled() => return Err(ExecuteError::Cancelled),
      };

      match fetched {
        Ok(source_dir) => return Ok((source_dir, attempt)),
        Err(e) if e.is_transient() && attempt <= self.config.fetch_retries => {
          warn!(attempt, retries = self.config.fetch_retries, error = %e, "fetch failed, retrying");
          tokio::select! {
            _ = tokio::time::sleep(self.config.retry_delay) => {}
            _ = self.cancel.cancelled() => return Err(ExecuteError::Cancelled),
          }
        }
        Err(e) => return Err(e.into()),
      }
    }
  }
}

/// Start every install from an empty working directory.
async fn prepare_work_dir(work_dir: &Path) -> Result<(), ExecuteError> {
  if tokio::fs::try_exists(work_dir).await.map_err(ExecuteError::io(work_dir))? {
    debug!(path = %work_dir.display(), "clearing stale working directory");
    tokio::fs::remove_dir_all(work_dir)
      .await
      .map_err(ExecuteError::io(work_dir))?;
  }
  tokio::fs::create_dir_all(work_dir)
    .await
    .map_err(ExecuteError::io(work_dir))
}

/// Whether an older link sits at `link`. Anything else there would shadow
/// the install for dependency resolution and is an error.
async fn check_opt_link(link: &Path) -> Result<bool, ExecuteError> {
  match tokio::fs::symlink_metadata(link).await {
    Ok(meta) if meta.file_type().is_symlink() => Ok(true),
    Ok(_) => Err(ExecuteError::OptLinkBlocked {
      path: link.to_path_buf(),
    }),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
    Err(e) => Err(ExecuteError::io(link)(e)),
  }
}

/// Point `<opt_dir>/<id>` at `install_prefix`, replacing an older link.
async fn link_opt(opt_dir: &Path, id: &str, install_prefix: &Path) -> Result<(), ExecuteError> {
  let link = opt_dir.join(id);
  tokio::fs::create_dir_all(opt_dir)
    .await
    .map_err(ExecuteError::io(opt_dir))?;

  if check_opt_link(&link).await? {
    tokio::fs::remove_file(&link).await.map_err(ExecuteError::io(&link))?;
  }

  #[cfg(unix)]
  tokio::fs::symlink(install_prefix, &link)
    .await
    .map_err(ExecuteError::io(&link))?;

  #[cfg(windows)]
  tokio::fs::symlink_dir(install_prefix, &link)
    .await
    .map_err(ExecuteError::io(&link))?;

  debug!(link = %link.display(), target = %install_prefix.display(), "linked install prefix");
  Ok(())
}
