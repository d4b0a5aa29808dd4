//! Install plan construction.
//!
//! [`build_plan`] turns a recipe's step templates into concrete process
//! invocations. It is pure: nothing is fetched, spawned or written, so the
//! exact argument lists can be checked without running a build.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::placeholder::{self, PlaceholderError, Resolver};
use crate::recipe::{RecipeDescriptor, StepTemplate};
use crate::resolve::ResolvedDeps;

/// A fully materialized external-process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
  pub program: String,
  pub args: Vec<String>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl BuildStep {
  pub fn new(program: &str, args: &[&str]) -> Self {
    Self {
      program: program.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
      env: BTreeMap::new(),
    }
  }
}

impl fmt::Display for BuildStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (key, value) in &self.env {
      write!(f, "{key}={value} ")?;
    }
    f.write_str(&self.program)?;
    for arg in &self.args {
      write!(f, " {arg}")?;
    }
    Ok(())
  }
}

/// Ordered steps for one install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InstallPlan {
  steps: Vec<BuildStep>,
}

impl InstallPlan {
  pub fn new(steps: Vec<BuildStep>) -> Self {
    Self { steps }
  }

  pub fn steps(&self) -> &[BuildStep] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

struct PlanResolver<'a> {
  prefix: String,
  src: String,
  deps: BTreeMap<&'a str, String>,
}

impl<'a> PlanResolver<'a> {
  fn new(deps: &'a ResolvedDeps, install_prefix: &Path, source_dir: &Path) -> Self {
    let deps = deps
      .iter()
      .map(|dep| (dep.id.as_str(), dep.install_prefix.to_string_lossy().into_owned()))
      .collect();
    Self {
      prefix: install_prefix.to_string_lossy().into_owned(),
      src: source_dir.to_string_lossy().into_owned(),
      deps,
    }
  }
}

impl Resolver for PlanResolver<'_> {
  fn resolve_prefix(&self) -> Result<&str, PlaceholderError> {
    Ok(&self.prefix)
  }

  fn resolve_dep(&self, id: &str) -> Result<&str, PlaceholderError> {
    self
      .deps
      .get(id)
      .map(String::as_str)
      .ok_or_else(|| PlaceholderError::UnresolvedDep(id.to_string()))
  }

  fn resolve_src(&self) -> Result<&str, PlaceholderError> {
    Ok(&self.src)
  }
}

fn materialize(template: &StepTemplate, resolver: &PlanResolver<'_>) -> Result<BuildStep, PlaceholderError> {
  let program = placeholder::substitute(&template.program, resolver)?;
  let args = template
    .args
    .iter()
    .map(|arg| placeholder::substitute(arg, resolver))
    .collect::<Result<Vec<_>, _>>()?;
  let env = template
    .env
    .iter()
    .map(|(key, value)| Ok((key.clone(), placeholder::substitute(value, resolver)?)))
    .collect::<Result<BTreeMap<_, _>, PlaceholderError>>()?;

  Ok(BuildStep { program, args, env })
}

/// Substitute resolved prefixes into the recipe's step templates.
///
/// # Errors
///
/// Fails only when `resolved` is missing a dependency the templates refer
/// to, which cannot happen when it came from resolving `recipe.depends_on()`.
pub fn build_plan(
  recipe: &RecipeDescriptor,
  resolved: &ResolvedDeps,
  install_prefix: &Path,
  source_dir: &Path,
) -> Result<InstallPlan, PlaceholderError> {
  let resolver = PlanResolver::new(resolved, install_prefix, source_dir);
  let steps = recipe
    .install()
    .iter()
    .map(|template| materialize(template, &resolver))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(InstallPlan::new(steps))
}
