//! Layered settings.
//!
//! Built-in defaults, then an optional `config.toml`, then the `KILN_ROOT` and
//! `KILN_CACHE` environment variables. The CLI applies its flags last.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{CACHE_ENV, ROOT_ENV};
use crate::execute::ExecuteConfig;
use crate::paths;
use crate::recipe::RecipeDescriptor;
use crate::resolve::{ChainResolver, OptResolver, StaticResolver};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config '{path}'")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot make '{path}' absolute")]
  Absolute {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config '{path}'")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
  pub root: Option<PathBuf>,
  pub cache: Option<PathBuf>,
  pub fetch_retries: Option<u32>,
  pub retry_delay_ms: Option<u64>,
  pub keep_work_dir: Option<bool>,
  #[serde(default)]
  pub dependencies: BTreeMap<String, PathBuf>,
}

impl ConfigFile {
  pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

/// Effective settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
  pub root: PathBuf,
  pub cache: PathBuf,
  pub fetch_retries: u32,
  pub retry_delay: Duration,
  pub keep_work_dir: bool,
  /// Static dependency prefixes consulted before `opt` links.
  pub dependencies: BTreeMap<String, PathBuf>,
}

impl Default for Settings {
  fn default() -> Self {
    let defaults = ExecuteConfig::new(PathBuf::new());
    Self {
      root: paths::root_dir(),
      cache: paths::cache_dir(),
      fetch_retries: defaults.fetch_retries,
      retry_delay: defaults.retry_delay,
      keep_work_dir: defaults.keep_work_dir,
      dependencies: BTreeMap::new(),
    }
  }
}

impl Settings {
  /// Load settings, reading `explicit` if given or the default config file
  /// if it exists.
  ///
  /// An explicit path that cannot be read is an error; a missing default
  /// file is not.
  pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let file = match explicit {
      Some(path) => Some(read_config(path)?),
      None => {
        let path = paths::config_dir().join(CONFIG_FILE);
        if path.is_file() { Some(read_config(&path)?) } else { None }
      }
    };

    let mut settings = Self::default();
    if let Some(file) = file {
      settings.merge(file);
    }
    settings.apply_env();
    settings.make_absolute()?;
    Ok(settings)
  }

  /// Anchor relative root, cache and dependency paths at the current
  /// directory.
  ///
  /// Steps run inside `<cache>/work/<id>`, so a relative path substituted
  /// into a step would name something else. Call again after overriding
  /// `root` or `cache`.
  pub fn make_absolute(&mut self) -> Result<(), ConfigError> {
    self.root = absolute(&self.root)?;
    self.cache = absolute(&self.cache)?;
    for prefix in self.dependencies.values_mut() {
      *prefix = absolute(prefix)?;
    }
    Ok(())
  }

  fn merge(&mut self, file: ConfigFile) {
    if let Some(root) = file.root {
      self.root = root;
    }
    if let Some(cache) = file.cache {
      self.cache = cache;
    }
    if let Some(retries) = file.fetch_retries {
      self.fetch_retries = retries;
    }
    if let Some(ms) = file.retry_delay_ms {
      self.retry_delay = Duration::from_millis(ms);
    }
    if let Some(keep) = file.keep_work_dir {
      self.keep_work_dir = keep;
    }
    self.dependencies.extend(file.dependencies);
  }

  fn apply_env(&mut self) {
    if let Some(root) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
      self.root = PathBuf::from(root);
    }
    if let Some(cache) = std::env::var_os(CACHE_ENV).filter(|v| !v.is_empty()) {
      self.cache = PathBuf::from(cache);
    }
  }

  pub fn downloads_dir(&self) -> PathBuf {
    paths::downloads_dir(&self.cache)
  }

  pub fn opt_dir(&self) -> PathBuf {
    paths::opt_dir(&self.root)
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    ExecuteConfig {
      work_root: paths::work_root(&self.cache),
      opt_dir: Some(self.opt_dir()),
      fetch_retries: self.fetch_retries,
      retry_delay: self.retry_delay,
      keep_work_dir: self.keep_work_dir,
    }
  }

  /// Config overrides first, then `opt` links under the root.
  pub fn resolver(&self) -> ChainResolver {
    ChainResolver::new()
      .with(StaticResolver::new(self.dependencies.clone()))
      .with(OptResolver::new(self.opt_dir()))
  }

  /// `explicit` made absolute if given, else the cellar prefix for `recipe`.
  pub fn install_prefix(&self, recipe: &RecipeDescriptor, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
      Some(prefix) => absolute(prefix),
      None => Ok(paths::cellar_prefix(&self.root, recipe.id(), recipe.version())),
    }
  }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
  if path.is_absolute() {
    return Ok(path.to_path_buf());
  }
  std::path::absolute(path).map_err(|source| ConfigError::Absolute {
    path: path.to_path_buf(),
    source,
  })
}

fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
  debug!(path = %path.display(), "reading config");
  let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  ConfigFile::parse(path, &text)
}
