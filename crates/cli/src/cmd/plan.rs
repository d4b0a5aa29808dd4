//! Implementation of the `kiln plan` command.
//!
//! Resolves dependencies and prints the concrete steps an install would run.
//! Nothing is downloaded or executed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use kiln_lib::config::Settings;
use kiln_lib::execute::{Executor, ProcessLauncher};
use kiln_lib::fetch::ArchiveFetcher;
use kiln_lib::plan::InstallPlan;
use kiln_lib::recipe::RecipeDescriptor;
use kiln_lib::resolve::ResolvedDeps;

use crate::output::{OutputFormat, print_info, print_json, print_stat, symbols};

#[derive(Serialize)]
struct PlanOutput<'a> {
  id: &'a str,
  install_prefix: PathBuf,
  source_dir: PathBuf,
  dependencies: &'a ResolvedDeps,
  steps: &'a InstallPlan,
}

pub fn cmd_plan(path: &Path, prefix: Option<&Path>, settings: &Settings, output: OutputFormat) -> Result<()> {
  let recipe = RecipeDescriptor::load(path).with_context(|| format!("Invalid recipe: {}", path.display()))?;
  let install_prefix = settings.install_prefix(&recipe, prefix)?;

  let executor = Executor::new(
    settings.resolver(),
    ArchiveFetcher::new(settings.downloads_dir()),
    ProcessLauncher::new(),
    settings.execute_config(),
  );
  let (resolved, plan) = executor.plan(&recipe, &install_prefix)?;
  let source_dir = executor.work_dir(&recipe);

  if output.is_json() {
    return print_json(&PlanOutput {
      id: recipe.id(),
      install_prefix,
      source_dir,
      dependencies: &resolved,
      steps: &plan,
    });
  }

  print_info(&format!("Plan for {}", recipe.id()));
  print_stat("Prefix", &install_prefix.display().to_string());
  print_stat("Source", recipe.url().as_str());
  for dep in resolved.iter() {
    print_stat(&dep.id, &dep.install_prefix.display().to_string());
  }
  println!();
  for (index, step) in plan.steps().iter().enumerate() {
    println!("  {} {}. {}", symbols::ARROW, index + 1, step);
  }
  Ok(())
}
