//! Error types for deplink.
//!
//! All operations return `Result<T>` which aliases `Result<T, LinkError>`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from discovery, ordering and conversion.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Manifest path does not exist.
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    /// Manifest is not valid TOML or lacks a required field.
    #[error("Invalid manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// Two manifests in one discovery scope declare the same package name.
    #[error("Duplicate package name(s): {}", .0.join(", "))]
    DuplicatePackage(Vec<String>),

    /// Conflicting or insufficient arguments.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Dependency graph is not acyclic.
    #[error("Dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// File system operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml_edit::TomlError),

    /// Invalid match pattern.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Temporary file could not replace its destination.
    #[error("Failed to persist file: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Unexpected error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LinkError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LinkError::ManifestParse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for deplink operations.
pub type Result<T> = std::result::Result<T, LinkError>;
