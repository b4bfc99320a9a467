//! File system output for converted manifests.
//!
//! Provides target resolution and atomic temp-file-then-replace writes.

pub mod sink;

pub use sink::{OutputTarget, WriteOptions, backup_file_name, write_atomic};
