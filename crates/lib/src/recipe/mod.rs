//! Recipe descriptors.
//!
//! A recipe names one package, where its source archive lives, the digest
//! the archive must have, the packages it depends on, and the ordered install
//! steps. [`RecipeDescriptor`] is the validated, immutable form; it is only
//! built from a [`RecipeDef`] through [`RecipeDescriptor::new`].

mod checksum;
mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::placeholder::{self, PlaceholderError};

pub use checksum::Sha256Digest;
pub use types::{RecipeDef, StepTemplate};

/// Errors raised while loading or validating a recipe.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("failed to read recipe '{path}'")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse recipe")]
  Parse(#[from] toml::de::Error),

  #[error("invalid sha256 checksum '{0}': expected 64 lowercase hex characters")]
  InvalidChecksum(String),

  #[error("invalid {field} URL '{value}': {message}")]
  InvalidUrl {
    field: &'static str,
    value: String,
    message: String,
  },

  #[error("invalid {field} '{value}': must be non-empty without whitespace or path separators")]
  InvalidName { field: &'static str, value: String },

  #[error("dependency '{0}' is listed more than once")]
  DuplicateDependency(String),

  #[error("recipe has no install steps")]
  EmptyInstall,

  #[error("install step {step} has an empty program")]
  EmptyProgram { step: usize },

  #[error("install step {step} has a malformed placeholder")]
  Placeholder {
    step: usize,
    #[source]
    source: PlaceholderError,
  },

  #[error("install step {step} references undeclared dependency '{id}'")]
  UndeclaredDependency { step: usize, id: String },
}

/// A validated recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDescriptor {
  id: String,
  description: String,
  homepage: Url,
  url: Url,
  sha256: Sha256Digest,
  #[serde(skip_serializing_if = "Option::is_none")]
  version: Option<String>,
  depends_on: Vec<String>,
  install: Vec<StepTemplate>,
}

impl RecipeDescriptor {
  /// Validate a raw definition.
  pub fn new(def: RecipeDef) -> Result<Self, ValidationError> {
    check_name("id", &def.id)?;
    if let Some(version) = &def.version {
      check_name("version", version)?;
    }

    let sha256: Sha256Digest = def.sha256.parse()?;
    let homepage = parse_url("homepage", &def.homepage)?;
    let url = parse_url("url", &def.url)?;

    let mut seen = HashSet::new();
    for dep in &def.depends_on {
      check_name("dependency id", dep)?;
      if !seen.insert(dep.as_str()) {
        return Err(ValidationError::DuplicateDependency(dep.clone()));
      }
    }

    if def.install.is_empty() {
      return Err(ValidationError::EmptyInstall);
    }

    for (index, template) in def.install.iter().enumerate() {
      let step = index + 1;
      if template.program.trim().is_empty() {
        return Err(ValidationError::EmptyProgram { step });
      }
      for text in template.strings() {
        let refs = placeholder::dependency_refs(text).map_err(|source| ValidationError::Placeholder { step, source })?;
        if let Some(id) = refs.into_iter().find(|id| !seen.contains(id.as_str())) {
          return Err(ValidationError::UndeclaredDependency { step, id });
        }
      }
    }

    debug!(id = %def.id, steps = def.install.len(), deps = def.depends_on.len(), "recipe validated");

    Ok(Self {
      id: def.id,
      description: def.description,
      homepage,
      url,
      sha256,
      version: def.version,
      depends_on: def.depends_on,
      install: def.install,
    })
  }

  /// Parse and validate a recipe from TOML text.
  pub fn from_toml(text: &str) -> Result<Self, ValidationError> {
    let def: RecipeDef = toml::from_str(text)?;
    Self::new(def)
  }

  /// Read, parse and validate a recipe file.
  pub fn load(path: &Path) -> Result<Self, ValidationError> {
    let text = std::fs::read_to_string(path).map_err(|source| ValidationError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml(&text)
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn homepage(&self) -> &Url {
    &self.homepage
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  pub fn sha256(&self) -> &Sha256Digest {
    &self.sha256
  }

  pub fn version(&self) -> Option<&str> {
    self.version.as_deref()
  }

  pub fn depends_on(&self) -> &[String] {
    &self.depends_on
  }

  pub fn install(&self) -> &[StepTemplate] {
    &self.install
  }
}

fn check_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
  let ok = !value.is_empty()
    && value != "."
    && value != ".."
    && !value.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\');
  if ok {
    Ok(())
  } else {
    Err(ValidationError::InvalidName {
      field,
      value: value.to_string(),
    })
  }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ValidationError> {
  Url::parse(value).map_err(|e| ValidationError::InvalidUrl {
    field,
    value: value.to_string(),
    message: e.to_string(),
  })
}
