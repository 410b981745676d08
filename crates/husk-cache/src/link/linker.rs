//! Virtual store linker
//!
//! Builds the pnpm-style layout from store entries:
//!
//! ```text
//! node_modules/
//!   .husk/
//!     <name>@<version>/node_modules/<name>/   files from the store
//!     <name>@<version>/node_modules/<dep>     -> ../../<dep>@<v>/node_modules/<dep>
//!   <name>                                    -> .husk/<name>@<version>/node_modules/<name>
//! ```
//!
//! Scoped names become `@scope+pkg@1.0.0` inside `.husk` and a real `@scope/`
//! directory everywhere else.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use husk_core::error::HuskError;
use husk_core::types::{LinkMode, ResolvedPackage};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cas::CasStore;
use crate::CacheResult;

/// Name of the virtual store directory inside `node_modules`
pub const VIRTUAL_STORE_DIR: &str = ".husk";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub packages_linked: usize,
    /// Files placed with the requested link kind
    pub files_linked: usize,
    /// Files copied, by request or after a failed link
    pub files_copied: usize,
    pub top_level_links: usize,
    pub sibling_links: usize,
    /// `name@version` of linked packages, in the order they were linked
    pub linked: Vec<String>,
    /// `name@version` of packages with no usable store entry
    pub missing: Vec<String>,
}

/// How a single file ended up in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Linked,
    Copied,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Linker {
    mode: LinkMode,
}

impl Linker {
    pub fn new(mode: LinkMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Rebuild `node_modules` from scratch for the given packages.
    ///
    /// Packages are linked in `order` (package names, dependencies first);
    /// any package the order leaves out follows in name order.
    pub fn link(
        &self,
        packages: &BTreeMap<String, ResolvedPackage>,
        order: &[String],
        store: &CasStore,
        node_modules: &Path,
    ) -> CacheResult<LinkReport> {
        remove_existing(node_modules)?;
        let virtual_root = node_modules.join(VIRTUAL_STORE_DIR);
        create_dir(&virtual_root)?;

        let mut report = LinkReport::default();
        let mut linked: BTreeMap<&str, PathBuf> = BTreeMap::new();

        for package in in_link_order(packages, order) {
            let version = package.version.to_string();
            let entry = store
                .entry(&package.name, &version)
                .filter(|_| store.has(&package.name, &version));
            let Some(entry) = entry else {
                debug!("no store entry for {}, not linking", package.id());
                report.missing.push(package.id());
                continue;
            };

            let package_dir = virtual_package_dir(&virtual_root, &package.name, &version);
            self.populate(Path::new(&entry.extracted_path), &package_dir, &mut report)?;

            let top_level = node_modules.join(&package.name);
            link_dir(&package_dir, &top_level)?;
            report.top_level_links += 1;
            report.packages_linked += 1;
            report.linked.push(package.id());

            linked.insert(package.name.as_str(), package_dir);
        }

        for package in packages.values() {
            if !linked.contains_key(package.name.as_str()) {
                continue;
            }
            let version = package.version.to_string();
            let siblings = virtual_root
                .join(virtual_dir_name(&package.name, &version))
                .join("node_modules");

            let dependencies = package
                .installable_dependencies()
                .chain(package.peer_dependencies.iter())
                .map(|(name, _)| name.as_str());
            for dependency in dependencies {
                if dependency == package.name {
                    continue;
                }
                let Some(target) = linked.get(dependency) else {
                    continue;
                };
                let link = siblings.join(dependency);
                if fs::symlink_metadata(&link).is_ok() {
                    continue;
                }
                link_dir(target, &link)?;
                report.sibling_links += 1;
            }
        }

        info!(
            "linked {} package(s): {} linked file(s), {} copied",
            report.packages_linked, report.files_linked, report.files_copied
        );
        Ok(report)
    }

    /// Materialize one store tree file by file
    fn populate(&self, source: &Path, dest: &Path, report: &mut LinkReport) -> CacheResult<()> {
        create_dir(dest)?;

        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(|e| {
                HuskError::io(
                    format!("Failed to walk {}", source.display()),
                    io::Error::new(io::ErrorKind::Other, e.to_string()),
                )
            })?;
            let Ok(relative) = entry.path().strip_prefix(source) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                create_dir(&target)?;
            } else if entry.file_type().is_symlink() {
                if let Ok(link_target) = fs::read_link(entry.path()) {
                    if let Err(e) = symlink_file(&link_target, &target) {
                        debug!("could not recreate symlink {}: {}", target.display(), e);
                    }
                }
            } else {
                match place_file(entry.path(), &target, self.mode)? {
                    Placement::Linked => report.files_linked += 1,
                    Placement::Copied => report.files_copied += 1,
                }
            }
        }
        Ok(())
    }
}

fn in_link_order<'a>(
    packages: &'a BTreeMap<String, ResolvedPackage>,
    order: &[String],
) -> Vec<&'a ResolvedPackage> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<&ResolvedPackage> = order
        .iter()
        .filter_map(|name| packages.get(name))
        .filter(|package| seen.insert(package.name.as_str()))
        .collect();
    ordered.extend(packages.values().filter(|package| !seen.contains(package.name.as_str())));
    ordered
}

/// Put `src` at `dst` using `mode`, copying when the link cannot be made
pub fn place_file(src: &Path, dst: &Path, mode: LinkMode) -> CacheResult<Placement> {
    let linked = match mode {
        LinkMode::Hardlink => fs::hard_link(src, dst),
        LinkMode::Symlink => symlink_file(src, dst),
        LinkMode::Copy => Err(io::Error::new(io::ErrorKind::Unsupported, "copy requested")),
    };

    match linked {
        Ok(()) => Ok(Placement::Linked),
        Err(_) => {
            fs::copy(src, dst)
                .map_err(|e| HuskError::io(format!("Failed to copy {}", src.display()), e))?;
            Ok(Placement::Copied)
        },
    }
}

/// `@scope/pkg` + `1.0.0` -> `@scope+pkg@1.0.0`
pub fn virtual_dir_name(name: &str, version: &str) -> String {
    format!("{}@{}", name.replace('/', "+"), version)
}

/// Where a package's files live inside the virtual store
pub fn virtual_package_dir(virtual_root: &Path, name: &str, version: &str) -> PathBuf {
    virtual_root
        .join(virtual_dir_name(name, version))
        .join("node_modules")
        .join(name)
}

fn remove_existing(node_modules: &Path) -> CacheResult<()> {
    let Ok(metadata) = fs::symlink_metadata(node_modules) else {
        return Ok(());
    };
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(node_modules)
    } else {
        fs::remove_file(node_modules)
    };
    removed.map_err(|e| HuskError::io(format!("Failed to remove {}", node_modules.display()), e))
}

fn create_dir(path: &Path) -> CacheResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| HuskError::io(format!("Failed to create {}", path.display()), e))
}

/// Directory link at `link` pointing to `target`
fn link_dir(target: &Path, link: &Path) -> CacheResult<()> {
    if let Some(parent) = link.parent() {
        create_dir(parent)?;
    }

    #[cfg(unix)]
    let result = {
        let parent = link.parent().unwrap_or_else(|| Path::new("."));
        let relative = pathdiff::diff_paths(target, parent).unwrap_or_else(|| target.to_path_buf());
        std::os::unix::fs::symlink(relative, link)
    };
    #[cfg(windows)]
    let result = junction::create(target, link);

    result.map_err(|e| HuskError::io(format!("Failed to link {}", link.display()), e))
}

fn symlink_file(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link)
    }
}
