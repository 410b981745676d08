//! Tar extraction
//!
//! npm tarballs wrap everything in one top-level directory (usually
//! `package/`). That first component is dropped so the destination holds the
//! package root directly.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use husk_core::error::HuskError;
use tar::{Archive, EntryType};
use tracing::debug;
use walkdir::WalkDir;

use crate::CacheResult;

/// What an extraction wrote
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    /// Entries left out: escaping symlinks, device nodes, wrapper-only paths
    pub skipped: usize,
}

/// Extract raw tar bytes into `dest_dir`, stripping the wrapper directory.
///
/// Every failure, filesystem ones included, is reported as
/// [`HuskError::Extraction`] for `package`.
pub fn extract(package: &str, tar_bytes: &[u8], dest_dir: &Path) -> CacheResult<ExtractStats> {
    extract_entries(package, tar_bytes, dest_dir).map_err(|e| match e {
        HuskError::Io { message, source } => HuskError::Extraction {
            package: package.to_string(),
            message: format!("{}: {}", message, source),
        },
        other => other,
    })
}

fn extract_entries(package: &str, tar_bytes: &[u8], dest_dir: &Path) -> CacheResult<ExtractStats> {
    let fail = |message: String| HuskError::Extraction {
        package: package.to_string(),
        message,
    };

    fs::create_dir_all(dest_dir)
        .map_err(|e| HuskError::io(format!("Failed to create {}", dest_dir.display()), e))?;

    let mut archive = Archive::new(tar_bytes);
    let mut stats = ExtractStats::default();
    let entries = archive
        .entries()
        .map_err(|e| fail(format!("unreadable tar archive: {}", e)))?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| fail(format!("corrupt tar entry: {}", e)))?;
        let entry_path = entry
            .path()
            .map_err(|e| fail(format!("invalid entry path: {}", e)))?
            .into_owned();

        let Some(relative) = strip_wrapper(&entry_path).map_err(fail)? else {
            stats.skipped += 1;
            continue;
        };
        reject_symlinked_parent(dest_dir, &relative).map_err(fail)?;
        let target = dest_dir.join(&relative);
        let mode = entry.header().mode().ok();

        match entry.header().entry_type() {
            EntryType::Regular | EntryType::Continuous => {
                extract_regular_file(&mut entry, &target)?;
                stats.files += 1;
            },
            EntryType::Directory => {
                if is_symlink(&target) {
                    return Err(fail(format!("directory {} replaces a symlink", relative.display())));
                }
                fs::create_dir_all(&target)
                    .map_err(|e| HuskError::io(format!("Failed to create {}", target.display()), e))?;
                stats.directories += 1;
            },
            EntryType::Symlink => {
                let link_target = entry
                    .link_name()
                    .map_err(|e| fail(format!("invalid symlink target: {}", e)))?
                    .map(|t| t.into_owned());
                match link_target {
                    Some(link_target) if symlink_stays_inside(&relative, &link_target) => {
                        create_symlink(&link_target, &target)?;
                        stats.symlinks += 1;
                    },
                    _ => {
                        debug!(
                            "{}: skipping symlink {} that leaves the package",
                            package,
                            entry_path.display()
                        );
                        stats.skipped += 1;
                    },
                }
                continue;
            },
            EntryType::Link => {
                // Hard links name another archive member; copy it if it is already out.
                let source = entry
                    .link_name()
                    .ok()
                    .flatten()
                    .and_then(|name| strip_wrapper(&name).ok().flatten())
                    .filter(|name| reject_symlinked_parent(dest_dir, name).is_ok());
                match source.map(|s| dest_dir.join(s)) {
                    Some(source) if is_plain_file(&source) => {
                        ensure_parent(&target)?;
                        fs::copy(&source, &target).map_err(|e| {
                            HuskError::io(format!("Failed to copy {}", source.display()), e)
                        })?;
                        stats.files += 1;
                    },
                    _ => stats.skipped += 1,
                }
            },
            _ => {
                stats.skipped += 1;
                continue;
            },
        }

        #[cfg(unix)]
        if let Some(mode) = mode {
            restore_permissions(&target, mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
    }

    drop_escaping_symlinks(package, dest_dir, &mut stats)?;
    Ok(stats)
}

/// Drop the first component and validate the rest.
///
/// `Ok(None)` means the entry is the wrapper directory itself.
pub fn strip_wrapper(entry_path: &Path) -> Result<Option<PathBuf>, String> {
    let mut stripped = PathBuf::new();
    let mut seen_wrapper = false;

    for component in entry_path.components() {
        match component {
            Component::Normal(part) => {
                if seen_wrapper {
                    stripped.push(part);
                } else {
                    seen_wrapper = true;
                }
            },
            Component::CurDir => {},
            Component::ParentDir => {
                return Err(format!("path traversal in {}", entry_path.display()));
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(format!("absolute path {}", entry_path.display()));
            },
        }
    }

    Ok(if stripped.as_os_str().is_empty() {
        None
    } else {
        Some(stripped)
    })
}

/// Whether a relative symlink at `link_path` (package-relative) resolves inside the package
fn symlink_stays_inside(link_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return false;
    }

    let mut depth: usize = link_path.components().count().saturating_sub(1);
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {},
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Refuse entries whose parent directories pass through a symlink.
///
/// Symlink targets are checked one at a time, so two links can combine into
/// a path that leaves the package; nothing is ever written through one.
fn reject_symlinked_parent(dest_dir: &Path, relative: &Path) -> Result<(), String> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };

    let mut current = dest_dir.to_path_buf();
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(format!(
                    "{} goes through symlink {}",
                    relative.display(),
                    current.display()
                ));
            },
            Ok(_) => {},
            Err(_) => break,
        }
    }
    Ok(())
}

/// Remove symlinks that resolve outside `dest_dir` once every entry is out
fn drop_escaping_symlinks(package: &str, dest_dir: &Path, stats: &mut ExtractStats) -> CacheResult<()> {
    if stats.symlinks == 0 {
        return Ok(());
    }
    let root = fs::canonicalize(dest_dir)
        .map_err(|e| HuskError::io(format!("Failed to resolve {}", dest_dir.display()), e))?;

    let links: Vec<PathBuf> = WalkDir::new(dest_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_symlink())
        .map(|entry| entry.into_path())
        .collect();

    for link in links {
        let escapes = matches!(fs::canonicalize(&link), Ok(resolved) if !resolved.starts_with(&root));
        if escapes {
            debug!("{}: removing symlink {} that resolves outside the package", package, link.display());
            fs::remove_file(&link)
                .map_err(|e| HuskError::io(format!("Failed to remove {}", link.display()), e))?;
            stats.symlinks -= 1;
            stats.skipped += 1;
        }
    }
    Ok(())
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn is_plain_file(path: &Path) -> bool {
    fs::symlink_metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

fn ensure_parent(path: &Path) -> CacheResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HuskError::io(format!("Failed to create {}", parent.display()), e))?;
    }
    Ok(())
}

fn extract_regular_file<R: Read>(entry: &mut tar::Entry<R>, dest_path: &Path) -> CacheResult<()> {
    ensure_parent(dest_path)?;

    // A later entry may overwrite an earlier one (or a symlink) of the same name.
    if fs::symlink_metadata(dest_path).is_ok() {
        let _ = fs::remove_file(dest_path);
    }

    let mut file = fs::File::create(dest_path)
        .map_err(|e| HuskError::io(format!("Failed to create {}", dest_path.display()), e))?;
    std::io::copy(entry, &mut file)
        .map_err(|e| HuskError::io(format!("Failed to write {}", dest_path.display()), e))?;
    Ok(())
}

fn create_symlink(link_target: &Path, dest_path: &Path) -> CacheResult<()> {
    ensure_parent(dest_path)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(link_target, dest_path)
            .map_err(|e| HuskError::io(format!("Failed to symlink {}", dest_path.display()), e))?;
    }
    #[cfg(windows)]
    {
        // Needs developer mode on Windows; the package still works without it.
        if let Err(e) = std::os::windows::fs::symlink_file(link_target, dest_path) {
            debug!("could not create symlink {}: {}", dest_path.display(), e);
        }
    }

    Ok(())
}

#[cfg(unix)]
fn restore_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.file_type().is_symlink() {
        return;
    }
    // Owner must keep read/write (and traverse on directories) or the store cannot be pruned.
    let floor = if metadata.is_dir() { 0o700 } else { 0o600 };
    let permissions = fs::Permissions::from_mode((mode & 0o777) | floor);
    let _ = fs::set_permissions(path, permissions);
}
