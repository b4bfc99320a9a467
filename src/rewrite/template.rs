//! Field references inside substitution templates.
//!
//! | Field                     | Value                                               |
//! |---------------------------|-----------------------------------------------------|
//! | `{package.name}`          | target package name                                 |
//! | `{package.version}`       | target package version                              |
//! | `{package.path}`          | target package directory                            |
//! | `{package.path.relative}` | target directory relative to the converting package |
//! | `{self.name}`             | converting package name                             |
//! | `{self.version}`          | converting package version                          |
//! | `{self.path}`             | converting package directory                        |
//!
//! Any other brace group is literal text, so inline tables such as
//! `{develop = true, path = "..."}` pass through.

use crate::manifest::PackageRecord;
use std::path::Path;

/// Renders field references for a conversion of `source` towards `target`.
///
/// With no `target`, `{package.*}` fields are left as written.
pub fn render(template: &str, source: &PackageRecord, target: Option<&PackageRecord>) -> String {
    let mut out = template.to_string();

    if let Some(target) = target {
        // Longest field first: `{package.path}` is a prefix of the relative form.
        out = out.replace("{package.path.relative}", &relative_dir(source, target));
        out = out.replace("{package.path}", &display_path(target.dir()));
        out = out.replace("{package.name}", &target.name);
        out = out.replace("{package.version}", &target.version);
    }

    out = out.replace("{self.path}", &display_path(source.dir()));
    out = out.replace("{self.name}", &source.name);
    out = out.replace("{self.version}", &source.version);
    out
}

/// Path from `source`'s directory to `target`'s directory, `/`-separated.
pub fn relative_dir(source: &PackageRecord, target: &PackageRecord) -> String {
    match pathdiff::diff_paths(target.dir(), source.dir()) {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) => display_path(&rel),
        None => display_path(target.dir()),
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
