//! Per-manifest conversion between registry versions and local path links.

use crate::error::Result;
use crate::fs::{WriteOptions, write_atomic};
use crate::manifest::{PackageRecord, PackageSet};
use crate::process::run_formatter;
use crate::rewrite::declaration::{ChangeRecord, DeclarationRewriter};
use crate::rewrite::rule::{Direction, MatchRule, resolve_rules};
use std::path::Path;

/// Converts the dependency declarations of one manifest.
///
/// `lookup` supplies the target packages that template fields such as
/// `{package.version}` are resolved against.
pub struct ManifestConverter<'a> {
    package: PackageRecord,
    lookup: &'a PackageSet,
}

impl<'a> ManifestConverter<'a> {
    /// Opens a manifest file, or the manifest inside a directory.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the manifest does not exist
    /// - `ManifestParse`: invalid TOML or not a package manifest
    pub fn open(path: impl AsRef<Path>, lookup: &'a PackageSet) -> Result<Self> {
        Ok(Self::new(PackageRecord::from_path(path)?, lookup))
    }

    pub fn new(package: PackageRecord, lookup: &'a PackageSet) -> Self {
        Self { package, lookup }
    }

    pub fn package(&self) -> &PackageRecord {
        &self.package
    }

    /// Rewrites matching declarations to editable path links.
    ///
    /// Explicit `rules` take precedence over rules derived from `packages`.
    pub fn convert_to_local(
        &self,
        rules: Option<&[MatchRule]>,
        packages: Option<&[PackageRecord]>,
        options: &WriteOptions,
    ) -> Result<Vec<ChangeRecord>> {
        self.convert(Direction::Local, rules, packages, options)
    }

    /// Rewrites matching declarations to the target packages' versions.
    ///
    /// Explicit `rules` take precedence over rules derived from `packages`.
    pub fn convert_to_remote(
        &self,
        rules: Option<&[MatchRule]>,
        packages: Option<&[PackageRecord]>,
        options: &WriteOptions,
    ) -> Result<Vec<ChangeRecord>> {
        self.convert(Direction::Remote, rules, packages, options)
    }

    pub fn convert(
        &self,
        direction: Direction,
        rules: Option<&[MatchRule]>,
        packages: Option<&[PackageRecord]>,
        options: &WriteOptions,
    ) -> Result<Vec<ChangeRecord>> {
        let rules = resolve_rules(rules, packages, direction)?;
        self.convert_to(&rules, options)
    }

    /// Applies `rules` and writes the result according to `options`.
    ///
    /// Nothing is written when the output target cannot be resolved or the
    /// manifest fails to parse.
    pub fn convert_to(&self, rules: &[MatchRule], options: &WriteOptions) -> Result<Vec<ChangeRecord>> {
        let target = options.target()?;
        let rewrite = DeclarationRewriter::new(&self.package, rules, self.lookup)
            .rewrite(&self.package.path)?;

        let Some(dest) = target.destination(&self.package) else {
            return Ok(rewrite.changes);
        };

        if rewrite.is_unchanged() && !target.writes_unchanged() {
            log::debug!("No changes for {}", self.package.path.display());
            return Ok(rewrite.changes);
        }

        write_atomic(&dest, &rewrite.body())?;
        log::info!(
            "{}: {} change(s) written to {}",
            self.package.name,
            rewrite.changes.len(),
            dest.display()
        );

        if let Some(formatter) = &options.formatter {
            run_formatter(formatter, &dest);
        }

        Ok(rewrite.changes)
    }
}
