//! Dependency resolution.
//!
//! A recipe lists dependency ids; before anything is fetched each id must map
//! to the prefix where that dependency is already installed. Resolution is a
//! static lookup against installed state, never an install of its own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// The first dependency id that has no known installed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved dependency '{id}': no installed prefix found")]
pub struct UnresolvedDependencyError {
  pub id: String,
}

/// A dependency id paired with its installed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
  pub id: String,
  pub install_prefix: PathBuf,
}

/// Resolved dependencies in declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedDeps(Vec<ResolvedDependency>);

impl ResolvedDeps {
  pub fn get(&self, id: &str) -> Option<&Path> {
    self
      .0
      .iter()
      .find(|dep| dep.id == id)
      .map(|dep| dep.install_prefix.as_path())
  }

  pub fn iter(&self) -> impl Iterator<Item = &ResolvedDependency> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl FromIterator<ResolvedDependency> for ResolvedDeps {
  fn from_iter<T: IntoIterator<Item = ResolvedDependency>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Maps dependency ids to installed prefixes.
pub trait DependencyResolver {
  /// Look up a single id.
  fn lookup(&self, id: &str) -> Option<PathBuf>;

  /// Resolve every id in order, failing on the first one without a prefix.
  fn resolve(&self, ids: &[String]) -> Result<ResolvedDeps, UnresolvedDependencyError> {
    ids
      .iter()
      .map(|id| {
        let install_prefix = self
          .lookup(id)
          .ok_or_else(|| UnresolvedDependencyError { id: id.clone() })?;
        debug!(id = %id, prefix = %install_prefix.display(), "resolved dependency");
        Ok(ResolvedDependency {
          id: id.clone(),
          install_prefix,
        })
      })
      .collect()
  }
}

/// A fixed id to prefix table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
  prefixes: BTreeMap<String, PathBuf>,
}

impl StaticResolver {
  pub fn new(prefixes: BTreeMap<String, PathBuf>) -> Self {
    Self { prefixes }
  }

  pub fn with(mut self, id: &str, prefix: impl Into<PathBuf>) -> Self {
    self.prefixes.insert(id.to_string(), prefix.into());
    self
  }
}

impl DependencyResolver for StaticResolver {
  fn lookup(&self, id: &str) -> Option<PathBuf> {
    self.prefixes.get(id).cloned()
  }
}

/// Resolves `<opt_dir>/<id>`, the links written after successful installs.
#[derive(Debug, Clone)]
pub struct OptResolver {
  opt_dir: PathBuf,
}

impl OptResolver {
  pub fn new(opt_dir: impl Into<PathBuf>) -> Self {
    Self { opt_dir: opt_dir.into() }
  }
}

impl DependencyResolver for OptResolver {
  fn lookup(&self, id: &str) -> Option<PathBuf> {
    let path = self.opt_dir.join(id);
    path.is_dir().then_some(path)
  }
}

/// Tries each resolver in turn; the first hit wins.
#[derive(Default)]
pub struct ChainResolver {
  resolvers: Vec<Box<dyn DependencyResolver>>,
}

impl ChainResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, resolver: impl DependencyResolver + 'static) -> Self {
    self.resolvers.push(Box::new(resolver));
    self
  }
}

impl DependencyResolver for ChainResolver {
  fn lookup(&self, id: &str) -> Option<PathBuf> {
    self.resolvers.iter().find_map(|r| r.lookup(id))
  }
}
