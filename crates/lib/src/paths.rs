//! Well-known directories.
//!
//! The root holds install prefixes (`cellar/`) and the `opt/` links that
//! dependency resolution reads. The cache holds downloads and working
//! directories. Both can be redirected with `KILN_ROOT` and `KILN_CACHE`.

use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, CACHE_ENV, CELLAR_DIR, DEFAULT_ROOT, OPT_DIR, ROOT_ENV};

fn env_path(var: &str) -> Option<PathBuf> {
  std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Returns the user's home directory, falling back to the temp directory.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  env_path("HOME").unwrap_or_else(std::env::temp_dir)
}

/// Returns the user's home directory, falling back to the temp directory.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  env_path("USERPROFILE").unwrap_or_else(std::env::temp_dir)
}

/// Root directory for install prefixes and `opt` links.
pub fn root_dir() -> PathBuf {
  env_path(ROOT_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
}

/// Directory for the optional config file.
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  env_path("XDG_CONFIG_HOME")
    .unwrap_or_else(|| home_dir().join(".config"))
    .join(APP_NAME)
}

/// Directory for the optional config file.
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  env_path("APPDATA").unwrap_or_else(home_dir).join(APP_NAME)
}

/// Directory for downloads and working directories.
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  if let Some(dir) = env_path(CACHE_ENV) {
    return dir;
  }
  env_path("XDG_CACHE_HOME")
    .unwrap_or_else(|| home_dir().join(".cache"))
    .join(APP_NAME)
}

/// Directory for downloads and working directories.
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  if let Some(dir) = env_path(CACHE_ENV) {
    return dir;
  }
  env_path("LOCALAPPDATA")
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
    .join("Cache")
}

pub fn downloads_dir(cache: &Path) -> PathBuf {
  cache.join("downloads")
}

pub fn work_root(cache: &Path) -> PathBuf {
  cache.join("work")
}

pub fn opt_dir(root: &Path) -> PathBuf {
  root.join(OPT_DIR)
}

/// Default install prefix: `<root>/cellar/<id>[/<version>]`.
pub fn cellar_prefix(root: &Path, id: &str, version: Option<&str>) -> PathBuf {
  let base = root.join(CELLAR_DIR).join(id);
  match version {
    Some(version) => base.join(version),
    None => base,
  }
}

#[cfg(test)]
#[cfg(not(windows))]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn root_defaults_and_env_override() {
    temp_env::with_var(ROOT_ENV, None::<&str>, || {
      assert_eq!(root_dir(), PathBuf::from(DEFAULT_ROOT));
    });
    temp_env::with_var(ROOT_ENV, Some("/tmp/kiln-root"), || {
      assert_eq!(root_dir(), PathBuf::from("/tmp/kiln-root"));
    });
  }

  #[test]
  #[serial]
  fn empty_env_values_are_ignored() {
    temp_env::with_var(ROOT_ENV, Some(""), || {
      assert_eq!(root_dir(), PathBuf::from(DEFAULT_ROOT));
    });
  }

  #[test]
  #[serial]
  fn cache_env_beats_xdg() {
    temp_env::with_vars(
      [
        (CACHE_ENV, Some("/custom/cache")),
        ("XDG_CACHE_HOME", Some("/xdg/cache")),
      ],
      || {
        assert_eq!(cache_dir(), PathBuf::from("/custom/cache"));
      },
    );
  }

  #[test]
  #[serial]
  fn xdg_fallback_to_home_directories() {
    temp_env::with_vars(
      [
        (CACHE_ENV, None::<&str>),
        ("XDG_CONFIG_HOME", None::<&str>),
        ("XDG_CACHE_HOME", None::<&str>),
        ("HOME", Some("/home/user")),
      ],
      || {
        assert_eq!(config_dir(), PathBuf::from("/home/user/.config").join(APP_NAME));
        assert_eq!(cache_dir(), PathBuf::from("/home/user/.cache").join(APP_NAME));
      },
    );
  }

  #[test]
  fn cellar_prefix_with_and_without_version() {
    let root = Path::new("/opt/kiln");
    assert_eq!(cellar_prefix(root, "grub", None), PathBuf::from("/opt/kiln/cellar/grub"));
    assert_eq!(
      cellar_prefix(root, "grub", Some("2.02")),
      PathBuf::from("/opt/kiln/cellar/grub/2.02")
    );
  }
}
