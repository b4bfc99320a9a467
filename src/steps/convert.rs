//! Orchestration logic for monorepo conversions.
//!
//! Discovery, graph construction and ordering happen before any manifest is
//! touched, so a duplicate name or a dependency cycle aborts the run with
//! nothing written.

use crate::error::{LinkError, Result};
use crate::fs::WriteOptions;
use crate::graph::DependencyGraph;
use crate::manifest::{DEFAULT_MANIFEST_NAME, ExcludeDirs, PackageRecord, PackageSet, find_packages};
use crate::process::run_update;
use crate::rewrite::{ChangeRecord, Direction, ManifestConverter, MatchRule, resolve_rules};
use colored::Colorize;
use std::path::PathBuf;

/// Where converted manifests go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Report changes, write nothing.
    Preview,
    /// Overwrite each package's manifest.
    #[default]
    InPlace,
    /// Write `<dir>/<package-name>_<manifest-file-name>`, leave sources alone.
    BackupDir(PathBuf),
}

/// Options for one [`convert`] run.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub direction: Direction,
    /// Directory searched for manifests.
    pub root: PathBuf,
    /// Packages whose manifests are never rewritten.
    pub exclude: Vec<String>,
    /// When set, only these packages' manifests are rewritten.
    pub include: Option<Vec<String>>,
    /// When set, only declarations of these packages are rewritten.
    pub only_change: Option<Vec<String>>,
    /// Explicit rules. Take precedence over rules derived from packages.
    pub rules: Option<Vec<MatchRule>>,
    pub exclude_dirs: ExcludeDirs,
    pub manifest_name: String,
    pub output: OutputMode,
    pub formatter: Option<String>,
    /// Run in each package directory whose manifest changed on disk.
    pub update_command: Option<String>,
    /// Collect per-package failures instead of aborting on the first one.
    pub keep_going: bool,
}

impl ConvertOptions {
    pub fn new(direction: Direction, root: impl Into<PathBuf>) -> Self {
        Self {
            direction,
            root: root.into(),
            exclude: Vec::new(),
            include: None,
            only_change: None,
            rules: None,
            exclude_dirs: ExcludeDirs::Default,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            output: OutputMode::InPlace,
            formatter: None,
            update_command: None,
            keep_going: false,
        }
    }

    fn write_options(&self) -> WriteOptions {
        let options = match &self.output {
            OutputMode::Preview => WriteOptions::preview(),
            OutputMode::InPlace => WriteOptions::in_place(),
            OutputMode::BackupDir(dir) => WriteOptions::to_backup_dir(dir),
        };
        WriteOptions {
            formatter: self.formatter.clone(),
            ..options
        }
    }

    fn is_selected(&self, name: &str) -> bool {
        if self.exclude.iter().any(|n| n == name) {
            return false;
        }
        match &self.include {
            Some(include) => include.iter().any(|n| n == name),
            None => true,
        }
    }
}

/// A package whose conversion failed in `keep_going` mode.
#[derive(Debug)]
pub struct PackageFailure {
    pub package: String,
    pub error: LinkError,
}

/// Outcome of a [`convert`] run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Converted packages and their changes, in processing order.
    pub changes: Vec<(String, Vec<ChangeRecord>)>,
    /// Packages left out by the include/exclude filters.
    pub skipped: Vec<String>,
    pub failures: Vec<PackageFailure>,
    /// Packages whose update command performed an update.
    pub updated: Vec<String>,
    root: PathBuf,
    preview: bool,
}

impl ConversionReport {
    pub fn changes_for(&self, package: &str) -> Option<&[ChangeRecord]> {
        self.changes
            .iter()
            .find(|(name, _)| name == package)
            .map(|(_, changes)| changes.as_slice())
    }

    pub fn total_changes(&self) -> usize {
        self.changes.iter().map(|(_, changes)| changes.len()).sum()
    }

    /// Names of packages with at least one change, in processing order.
    pub fn changed_packages(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|(_, changes)| !changes.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn print_summary(&self) {
        if self.preview {
            println!("\n{}", "DRY RUN - No changes will be made".yellow().bold());
        }

        if self.total_changes() == 0 {
            println!("\n{}", "No changes needed".yellow());
        } else {
            if !self.preview {
                println!("\n{}", "Changes applied:".green().bold());
            }
            for (name, changes) in self.changes.iter().filter(|(_, c)| !c.is_empty()) {
                println!(
                    "\n{} {} ({} change{})",
                    "📦".bold(),
                    name.bold(),
                    changes.len(),
                    if changes.len() == 1 { "" } else { "s" }
                );
                for change in changes {
                    println!("   {} {}", "-".red(), change.original.trim().dimmed());
                    println!("   {} {}", "+".green(), change.replacement.trim());
                }
            }
        }

        if !self.skipped.is_empty() {
            println!("\n{} Skipped: {}", "⏭".bold(), self.skipped.join(", ").dimmed());
        }

        if !self.updated.is_empty() {
            println!("\n{} Updated environments: {}", "🔄".bold(), self.updated.join(", "));
        }

        if !self.failures.is_empty() {
            println!("\n{} Failed ({})", "✗".red().bold(), self.failures.len());
            for failure in &self.failures {
                println!("   {} {}", failure.package.red(), failure.error);
            }
        }

        let converted = self.changed_packages().len();
        println!(
            "\n{} {} package{} under {}",
            if self.preview {
                "Would convert".yellow().bold()
            } else {
                "Converted".green().bold()
            },
            converted,
            if converted == 1 { "" } else { "s" },
            self.root.display()
        );
    }
}

/// Converts every selected package under `options.root`.
///
/// ## Phases
///
/// 1. Discover manifests and build the package set
/// 2. Build the dependency graph and order it dependencies-first
/// 3. Resolve the rule set once for the whole run
/// 4. Convert each selected package in order
///
/// # Errors
///
/// Discovery, duplicate-name, cycle and rule errors abort before any write.
/// A per-package failure aborts the remaining packages unless
/// `keep_going` is set.
pub fn convert(options: &ConvertOptions) -> Result<ConversionReport> {
    log::info!(
        "Converting packages under {} to {}",
        options.root.display(),
        options.direction
    );

    let packages = find_packages(&options.root, &options.exclude_dirs, &options.manifest_name)?;
    warn_unknown(&packages, "exclude", &options.exclude);
    if let Some(include) = &options.include {
        warn_unknown(&packages, "include", include);
    }

    let order = DependencyGraph::build(&packages).conversion_order()?;
    let rules = build_rules(options, &packages)?;
    let write_options = options.write_options();

    let mut report = ConversionReport {
        root: options.root.clone(),
        preview: options.output == OutputMode::Preview,
        ..ConversionReport::default()
    };

    for name in order {
        let Some(package) = packages.get(&name) else {
            continue;
        };

        if !options.is_selected(&name) {
            log::debug!("Skipping {}", name);
            report.skipped.push(name);
            continue;
        }

        log::info!("Converting {} ({})", name, package.path.display());
        let converter = ManifestConverter::new(package.clone(), &packages);
        match converter.convert_to(&rules, &write_options) {
            Ok(changes) => {
                if let Some(command) = &options.update_command {
                    let changed_on_disk = options.output == OutputMode::InPlace && !changes.is_empty();
                    if changed_on_disk && run_update(command, package).is_some() {
                        report.updated.push(name.clone());
                    }
                }
                report.changes.push((name, changes));
            }
            Err(error) if options.keep_going => {
                log::warn!("Failed to convert {}: {}", name, error);
                report.failures.push(PackageFailure {
                    package: name,
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(report)
}

fn build_rules(options: &ConvertOptions, packages: &PackageSet) -> Result<Vec<MatchRule>> {
    let targets: Vec<PackageRecord> = match &options.only_change {
        Some(names) => {
            warn_unknown(packages, "only-change", names);
            packages
                .iter()
                .filter(|pkg| names.contains(&pkg.name))
                .cloned()
                .collect()
        }
        None => packages.as_slice().to_vec(),
    };

    if options.rules.is_none() && targets.is_empty() {
        return Err(LinkError::Configuration(format!(
            "no packages to derive rules from under {}",
            options.root.display()
        )));
    }

    resolve_rules(options.rules.as_deref(), Some(targets.as_slice()), options.direction)
}

fn warn_unknown(packages: &PackageSet, filter: &str, names: &[String]) {
    for name in names.iter().filter(|n| !packages.contains(n)) {
        log::warn!("--{} names unknown package '{}'", filter, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_package(root: &Path, dir: &str, name: &str, version: &str, deps: &[(&str, &str)]) {
        let mut content = format!(
            "[tool.poetry]\nname = \"{name}\"\nversion = \"{version}\"\n\n[tool.poetry.dependencies]\npython = \"^3.9\"\n"
        );
        for (dep, value) in deps {
            content.push_str(&format!("{dep} = {value}\n"));
        }
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join("pyproject.toml"), content).unwrap();
    }

    fn read(root: &Path, dir: &str) -> String {
        fs::read_to_string(root.join(dir).join("pyproject.toml")).unwrap()
    }

    /// `app -> lib -> core`, all declared as registry versions.
    fn remote_chain() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_package(root, "app", "app", "0.3.0", &[("lib", "\"^0.2.0\"")]);
        write_package(root, "lib", "lib", "0.2.0", &[("core", "\"^0.1.0\"")]);
        write_package(root, "core", "core", "0.1.0", &[]);
        temp
    }

    /// `app -> lib -> core`, all declared as local paths.
    fn local_chain() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_package(
            root,
            "app",
            "app",
            "0.3.0",
            &[("lib", "{develop = true, path = \"../lib\"}")],
        );
        write_package(
            root,
            "lib",
            "lib",
            "0.2.0",
            &[("core", "{develop = true, path = \"../core\"}")],
        );
        write_package(root, "core", "core", "0.1.0", &[]);
        temp
    }

    #[test]
    fn test_to_remote_visits_dependencies_first() {
        let temp = local_chain();
        let report = convert(&ConvertOptions::new(Direction::Remote, temp.path())).unwrap();

        let order: Vec<&str> = report.changes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["core", "lib", "app"]);
        assert_eq!(report.total_changes(), 2);
        assert!(read(temp.path(), "app").contains("lib = \"0.2.0\""));
        assert!(read(temp.path(), "lib").contains("core = \"0.1.0\""));
    }

    #[test]
    fn test_to_local_rewrites_all() {
        let temp = remote_chain();
        let report = convert(&ConvertOptions::new(Direction::Local, temp.path())).unwrap();

        assert_eq!(report.changed_packages(), vec!["lib", "app"]);
        assert!(read(temp.path(), "app").contains("lib = {develop = true, path = \"../lib\"}"));
        assert!(read(temp.path(), "lib").contains("core = {develop = true, path = \"../core\"}"));
    }

    #[test]
    fn test_second_run_is_noop() {
        let temp = remote_chain();
        let options = ConvertOptions::new(Direction::Local, temp.path());

        convert(&options).unwrap();
        let report = convert(&options).unwrap();

        assert_eq!(report.total_changes(), 0);
    }

    #[test]
    fn test_cycle_aborts_without_writes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_package(root, "a", "a", "1.0.0", &[("b", "{path = \"../b\"}")]);
        write_package(root, "b", "b", "1.0.0", &[("a", "{path = \"../a\"}")]);
        let before = (read(root, "a"), read(root, "b"));

        let err = convert(&ConvertOptions::new(Direction::Remote, root)).unwrap_err();

        match err {
            LinkError::Cycle(mut names) => {
                names.sort();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!((read(root, "a"), read(root, "b")), before);
    }

    #[test]
    fn test_duplicate_names_abort() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "one", "same", "1.0.0", &[]);
        write_package(temp.path(), "two", "same", "1.0.0", &[]);

        let err = convert(&ConvertOptions::new(Direction::Local, temp.path())).unwrap_err();
        assert!(matches!(err, LinkError::DuplicatePackage(_)));
    }

    #[test]
    fn test_exclude_and_include_filters() {
        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.exclude = vec!["app".to_string()];

        let report = convert(&options).unwrap();
        assert_eq!(report.skipped, vec!["app"]);
        assert!(read(temp.path(), "app").contains("lib = \"^0.2.0\""));
        assert!(read(temp.path(), "lib").contains("path = \"../core\""));

        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.include = Some(vec!["app".to_string()]);

        let report = convert(&options).unwrap();
        assert_eq!(report.skipped, vec!["core", "lib"]);
        assert!(read(temp.path(), "app").contains("path = \"../lib\""));
        assert!(read(temp.path(), "lib").contains("core = \"^0.1.0\""));
    }

    #[test]
    fn test_only_change_limits_declarations() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_package(
            root,
            "app",
            "app",
            "0.3.0",
            &[("lib", "\"^0.2.0\""), ("core", "\"^0.1.0\"")],
        );
        write_package(root, "lib", "lib", "0.2.0", &[]);
        write_package(root, "core", "core", "0.1.0", &[]);

        let mut options = ConvertOptions::new(Direction::Local, root);
        options.only_change = Some(vec!["core".to_string()]);
        convert(&options).unwrap();

        let app = read(root, "app");
        assert!(app.contains("lib = \"^0.2.0\""));
        assert!(app.contains("core = {develop = true, path = \"../core\"}"));
    }

    #[test]
    fn test_only_change_unknown_is_configuration_error() {
        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.only_change = Some(vec!["ghost".to_string()]);

        let err = convert(&options).unwrap_err();
        assert!(matches!(err, LinkError::Configuration(_)));
    }

    #[test]
    fn test_explicit_rules_override_derived() {
        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.rules = Some(vec![MatchRule::to_local("core").unwrap()]);

        convert(&options).unwrap();

        assert!(read(temp.path(), "app").contains("lib = \"^0.2.0\""));
        assert!(read(temp.path(), "lib").contains("path = \"../core\""));
    }

    #[test]
    fn test_preview_writes_nothing() {
        let temp = remote_chain();
        let before = read(temp.path(), "app");
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.output = OutputMode::Preview;

        let report = convert(&options).unwrap();

        assert_eq!(report.total_changes(), 2);
        assert_eq!(read(temp.path(), "app"), before);
    }

    #[test]
    fn test_backup_dir_output() {
        let temp = remote_chain();
        let backup = temp.path().join("backup");
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.output = OutputMode::BackupDir(backup.clone());

        convert(&options).unwrap();

        assert!(backup.join("app_pyproject.toml").is_file());
        assert!(backup.join("lib_pyproject.toml").is_file());
        assert!(!backup.join("core_pyproject.toml").exists());
        assert!(read(temp.path(), "app").contains("lib = \"^0.2.0\""));
    }

    #[test]
    fn test_keep_going_collects_failures() {
        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.output = OutputMode::BackupDir(temp.path().join("blocked"));
        // A file where the backup directory should be makes every write fail.
        fs::write(temp.path().join("blocked"), "").unwrap();

        assert!(convert(&options).is_err());

        options.keep_going = true;
        let report = convert(&options).unwrap();
        let failed: Vec<&str> = report.failures.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(failed, vec!["lib", "app"]);
        assert!(!report.is_success());
        assert_eq!(report.changes_for("core"), Some(&[][..]));
    }

    #[cfg(unix)]
    #[test]
    fn test_update_runs_only_for_changed_packages() {
        let temp = remote_chain();
        let mut options = ConvertOptions::new(Direction::Local, temp.path());
        options.update_command = Some("touch updated.marker && echo updated".to_string());

        let report = convert(&options).unwrap();

        assert_eq!(report.updated, vec!["lib", "app"]);
        assert!(temp.path().join("app/updated.marker").exists());
        assert!(!temp.path().join("core/updated.marker").exists());
    }
}
