//! Manifest discovery across a monorepo.

use crate::error::{LinkError, Result};
use crate::manifest::package::{PackageRecord, PackageSet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directory names skipped unless the caller overrides the list.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "__pycache__",
    "dist",
    "build",
    "docker_staging",
    "node_modules",
    ".git",
    ".venv",
];

/// Which directory names discovery prunes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcludeDirs {
    /// [`DEFAULT_EXCLUDE_DIRS`].
    #[default]
    Default,
    /// Prune nothing by name (hidden directories are still skipped).
    Nothing,
    /// Prune exactly these names.
    Only(Vec<String>),
}

impl ExcludeDirs {
    pub fn names(&self) -> HashSet<String> {
        match self {
            ExcludeDirs::Default => DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            ExcludeDirs::Nothing => HashSet::new(),
            ExcludeDirs::Only(names) => names.iter().cloned().collect(),
        }
    }
}

/// Recursively finds files named `manifest_name` below `root`.
///
/// Hidden directories and directories listed in `exclude` are pruned.
/// `.gitignore` rules are not consulted. Results are sorted by path.
pub fn find_manifests(root: &Path, exclude: &ExcludeDirs, manifest_name: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(LinkError::NotFound(root.to_path_buf()));
    }

    let excluded = exclude.names();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry.depth() > 0
                && excluded.contains(entry.file_name().to_string_lossy().as_ref()))
        })
        .build();

    let mut manifests = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_some_and(|ft| ft.is_file()) && entry.file_name() == manifest_name {
            manifests.push(entry.into_path());
        }
    }

    manifests.sort();
    log::debug!(
        "Found {} {} file(s) under {}",
        manifests.len(),
        manifest_name,
        root.display()
    );
    Ok(manifests)
}

/// Discovers and loads every package below `root`.
///
/// Manifests without a package table are skipped.
///
/// # Errors
///
/// - `ManifestParse`: a manifest is malformed
/// - `DuplicatePackage`: two manifests declare the same name
pub fn find_packages(root: &Path, exclude: &ExcludeDirs, manifest_name: &str) -> Result<PackageSet> {
    let mut packages = Vec::new();

    for manifest in find_manifests(root, exclude, manifest_name)? {
        match PackageRecord::load(&manifest)? {
            Some(record) => packages.push(record),
            None => log::debug!("Not a package, skipping: {}", manifest.display()),
        }
    }

    PackageSet::new(packages)
}
