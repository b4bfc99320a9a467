//! Where converted manifests are written.
//!
//! A conversion writes to at most one target:
//!
//! - **in place**: the source manifest is replaced
//! - **destination file**: an explicit path, the source is untouched
//! - **backup directory**: `<dir>/<package-name>_<manifest-file-name>`
//! - **preview**: nothing is written
//!
//! Every write goes to a temporary file in the destination directory first
//! and is then persisted over the destination, so a failed conversion never
//! leaves a half-written manifest behind.

use crate::error::{LinkError, Result};
use crate::manifest::PackageRecord;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Output options for one manifest conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub dest_file: Option<PathBuf>,
    pub in_place: bool,
    pub backup_dir: Option<PathBuf>,
    /// Command run as `<formatter> <written-file>` after a write.
    pub formatter: Option<String>,
}

impl WriteOptions {
    /// Compute changes without writing anything.
    pub fn preview() -> Self {
        Self::default()
    }

    pub fn in_place() -> Self {
        Self {
            in_place: true,
            ..Self::default()
        }
    }

    pub fn to_file(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest_file: Some(dest.into()),
            ..Self::default()
        }
    }

    pub fn to_backup_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }

    /// Resolves the single output target.
    ///
    /// # Errors
    ///
    /// `Configuration` if more than one target is requested.
    pub fn target(&self) -> Result<OutputTarget> {
        match (self.in_place, &self.dest_file, &self.backup_dir) {
            (false, None, None) => Ok(OutputTarget::Preview),
            (true, None, None) => Ok(OutputTarget::InPlace),
            (false, Some(dest), None) => Ok(OutputTarget::File(dest.clone())),
            (false, None, Some(dir)) => Ok(OutputTarget::BackupDir(dir.clone())),
            _ => Err(LinkError::Configuration(
                "only one of in-place, destination file, or backup directory can be specified"
                    .to_string(),
            )),
        }
    }
}

/// Resolved output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Preview,
    InPlace,
    File(PathBuf),
    BackupDir(PathBuf),
}

impl OutputTarget {
    /// File that receives the converted manifest of `source`.
    pub fn destination(&self, source: &PackageRecord) -> Option<PathBuf> {
        match self {
            OutputTarget::Preview => None,
            OutputTarget::InPlace => Some(source.path.clone()),
            OutputTarget::File(dest) => Some(dest.clone()),
            OutputTarget::BackupDir(dir) => Some(dir.join(backup_file_name(source))),
        }
    }

    /// Whether an unchanged manifest is still written.
    ///
    /// Only an explicit destination file receives a verbatim copy; in-place
    /// rewrites would be no-ops and backups are only kept for real changes.
    pub fn writes_unchanged(&self) -> bool {
        matches!(self, OutputTarget::File(_))
    }
}

/// `<package-name>_<manifest-file-name>`, e.g. `core_pyproject.toml`.
pub fn backup_file_name(source: &PackageRecord) -> String {
    format!("{}_{}", source.name, source.manifest_file_name())
}

/// Replaces `path` with `contents` via a temporary file in the same directory.
///
/// Missing parent directories are created. An existing file keeps its
/// permissions.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())?;
    }

    tmp.persist(path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}
