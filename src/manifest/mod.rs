//! Package manifests: parsing and discovery.
//!
//! - **`package`**: `PackageRecord` and `PackageSet`, parsed with `toml_edit`
//! - **`discovery`**: recursive manifest search with directory exclusions

pub mod discovery;
pub mod package;

pub use discovery::{DEFAULT_EXCLUDE_DIRS, ExcludeDirs, find_manifests, find_packages};
pub use package::{DEFAULT_MANIFEST_NAME, Declaration, PackageRecord, PackageSet};
