//! Implementation of the `kiln check` command.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::recipe::RecipeDescriptor;

use crate::output::{OutputFormat, print_json, print_stat, print_success};

pub fn cmd_check(path: &Path, output: OutputFormat) -> Result<()> {
  let recipe = RecipeDescriptor::load(path).with_context(|| format!("Invalid recipe: {}", path.display()))?;

  if output.is_json() {
    return print_json(&recipe);
  }

  print_success(&format!("{} is valid", recipe.id()));
  if let Some(version) = recipe.version() {
    print_stat("Version", version);
  }
  print_stat("Source", recipe.url().as_str());
  print_stat("SHA-256", recipe.sha256().as_str());
  if !recipe.depends_on().is_empty() {
    print_stat("Depends on", &recipe.depends_on().join(", "));
  }
  print_stat("Steps", &recipe.install().len().to_string());
  Ok(())
}
