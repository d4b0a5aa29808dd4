//! Archive extraction.
//!
//! Source archives conventionally wrap everything in one top-level directory
//! (`grub-2.02/`). That first component is stripped so the destination
//! directory itself becomes the source tree.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;

use crate::fetch::FetchError;

/// Supported archive formats, detected from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  TarGz,
  TarXz,
  Tar,
  Zip,
}

impl ArchiveKind {
  pub fn detect(file_name: &str) -> Option<Self> {
    let name = file_name.to_ascii_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
      Some(Self::TarXz)
    } else if name.ends_with(".tar") {
      Some(Self::Tar)
    } else if name.ends_with(".zip") {
      Some(Self::Zip)
    } else {
      None
    }
  }
}

/// Extract `archive_path` into `dest`, stripping the top-level directory.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<(), FetchError> {
  let name = archive_path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  let kind = ArchiveKind::detect(&name).ok_or_else(|| FetchError::UnsupportedArchive(name.clone()))?;

  fs::create_dir_all(dest)?;
  debug!(archive = %archive_path.display(), kind = ?kind, "unpacking");

  let file = BufReader::new(File::open(archive_path)?);
  let result = match kind {
    ArchiveKind::TarGz => unpack_tar(Archive::new(GzDecoder::new(file)), dest),
    ArchiveKind::TarXz => unpack_tar(Archive::new(XzDecoder::new(file)), dest),
    ArchiveKind::Tar => unpack_tar(Archive::new(file), dest),
    ArchiveKind::Zip => unpack_zip(file, dest),
  };

  result.map_err(|message| FetchError::Extract {
    path: archive_path.to_path_buf(),
    message,
  })?;

  info!(dest = %dest.display(), "unpacked source");
  Ok(())
}

/// Drop the first component and reject entry paths that could escape `dest`.
///
/// Link targets are checked separately by [`check_link_target`].
fn strip_top_level(path: &Path) -> Result<Option<PathBuf>, String> {
  let stripped: PathBuf = path.components().skip(1).collect();
  if stripped.as_os_str().is_empty() {
    return Ok(None);
  }
  if !stripped.components().all(|c| matches!(c, Component::Normal(_))) {
    return Err(format!("refusing to extract entry outside destination: {}", path.display()));
  }
  Ok(Some(stripped))
}

/// Check that a link at `entry` (already stripped) pointing at `target` stays
/// inside the destination. `target` is relative to the link's directory.
fn check_link_target(entry: &Path, target: &Path) -> Result<(), String> {
  let mut depth = entry.components().count().saturating_sub(1);
  for component in target.components() {
    match component {
      Component::Normal(_) => depth += 1,
      Component::CurDir => {}
      Component::ParentDir if depth > 0 => depth -= 1,
      _ => {
        return Err(format!(
          "refusing link {} -> {} outside destination",
          entry.display(),
          target.display()
        ));
      }
    }
  }
  Ok(())
}

/// `parent` must not lead outside `root` through an earlier symlink.
fn check_parent_inside(root: &Path, parent: &Path) -> Result<(), String> {
  let resolved = parent.canonicalize().map_err(|e| format!("{}: {e}", parent.display()))?;
  if resolved.starts_with(root) {
    Ok(())
  } else {
    Err(format!("refusing to extract through link to {}", resolved.display()))
  }
}

fn unpack_tar<R: Read>(mut archive: Archive<R>, dest: &Path) -> Result<(), String> {
  let root = dest.canonicalize().map_err(|e| format!("{}: {e}", dest.display()))?;
  let entries = archive.entries().map_err(|e| e.to_string())?;

  for entry in entries {
    let mut entry = entry.map_err(|e| e.to_string())?;
    let path = entry.path().map_err(|e| e.to_string())?.into_owned();

    let Some(stripped) = strip_top_level(&path)? else {
      continue;
    };
    let dest_path = dest.join(&stripped);

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(|e| e.to_string())?;
      check_parent_inside(&root, parent)?;
    }

    let entry_type = entry.header().entry_type();
    if entry_type.is_symlink() || entry_type.is_hard_link() {
      let target = entry
        .link_name()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("link without target: {}", path.display()))?
        .into_owned();

      if entry_type.is_hard_link() {
        // Hard link targets name another entry of the same archive.
        let Some(target) = strip_top_level(&target)? else {
          return Err(format!("hard link to archive root: {}", path.display()));
        };
        fs::hard_link(dest.join(&target), &dest_path).map_err(|e| format!("{}: {e}", path.display()))?;
        continue;
      }

      check_link_target(&stripped, &target)?;
    }

    entry
      .unpack(&dest_path)
      .map_err(|e| format!("{}: {e}", path.display()))?;
  }

  Ok(())
}

fn unpack_zip<R: Read + std::io::Seek>(reader: R, dest: &Path) -> Result<(), String> {
  let root = dest.canonicalize().map_err(|e| format!("{}: {e}", dest.display()))?;
  let mut archive = zip::ZipArchive::new(reader).map_err(|e| format!("failed to open zip: {e}"))?;

  for i in 0..archive.len() {
    let mut file = archive
      .by_index(i)
      .map_err(|e| format!("failed to read zip entry: {e}"))?;
    let path = file
      .enclosed_name()
      .ok_or_else(|| format!("invalid zip entry name: {}", file.name()))?;

    let Some(stripped) = strip_top_level(&path)? else {
      continue;
    };
    let dest_path = dest.join(stripped);

    if file.is_dir() {
      fs::create_dir_all(&dest_path).map_err(|e| e.to_string())?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(|e| e.to_string())?;
      check_parent_inside(&root, parent)?;
    }
    let mut outfile = File::create(&dest_path).map_err(|e| e.to_string())?;
    std::io::copy(&mut file, &mut outfile).map_err(|e| e.to_string())?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = file.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(|e| e.to_string())?;
      }
    }
  }

  Ok(())
}
