use crate::error::{LinkError, Result};
use crate::manifest::{DEFAULT_EXCLUDE_DIRS, DEFAULT_MANIFEST_NAME, ExcludeDirs};
use crate::rewrite::Direction;
use crate::steps::{ConvertOptions, OutputMode, convert};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Replace registry versions with editable path links
    ToLocal,
    /// Replace path links with the linked package's version
    ToRemote,
}

impl From<Action> for Direction {
    fn from(action: Action) -> Self {
        match action {
            Action::ToLocal => Direction::Local,
            Action::ToRemote => Direction::Remote,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(verbatim_doc_comment)]
pub struct ConvertArgs {
    /// Form to convert dependency declarations to
    #[arg(value_enum)]
    pub action: Action,

    /// Monorepo directory searched for package manifests
    pub dir: PathBuf,

    /// Never rewrite this package's manifest (repeatable)
    #[arg(long, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Only rewrite these packages' manifests (repeatable)
    #[arg(long, value_name = "NAME")]
    pub include: Vec<String>,

    /// Only rewrite declarations of these packages (repeatable)
    #[arg(long, value_name = "NAME")]
    pub only_change: Vec<String>,

    /// Show what would change without writing anything
    #[arg(long, short = 'n', conflicts_with = "backup_dir")]
    pub dry_run: bool,

    /// Write converted manifests to DIR as <package>_<manifest> instead of in place
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Manifest file name to search for
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MANIFEST_NAME)]
    pub manifest_name: String,

    /// Do not skip the default cache, VCS, and build directories
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Skip directories with this name during discovery (repeatable)
    #[arg(long, value_name = "NAME")]
    pub exclude_dir: Vec<String>,

    /// Command run as `<CMD> <file>` on every written manifest
    #[arg(long, value_name = "CMD")]
    pub formatter: Option<String>,

    /// Command run in each package directory whose manifest changed
    ///
    /// Example:
    ///   --update-command "poetry update"
    #[arg(long, value_name = "CMD", verbatim_doc_comment)]
    pub update_command: Option<String>,

    /// Continue with the next package when one fails
    #[arg(long)]
    pub keep_going: bool,
}

impl ConvertArgs {
    /// Directory exclusions for discovery.
    ///
    /// Extra `--exclude-dir` names extend the defaults unless
    /// `--no-default-excludes` is given.
    pub fn exclude_dirs(&self) -> ExcludeDirs {
        match (self.no_default_excludes, self.exclude_dir.is_empty()) {
            (false, true) => ExcludeDirs::Default,
            (true, true) => ExcludeDirs::Nothing,
            (false, false) => ExcludeDirs::Only(
                DEFAULT_EXCLUDE_DIRS
                    .iter()
                    .map(|s| s.to_string())
                    .chain(self.exclude_dir.iter().cloned())
                    .collect(),
            ),
            (true, false) => ExcludeDirs::Only(self.exclude_dir.clone()),
        }
    }

    pub fn output(&self) -> OutputMode {
        match (&self.backup_dir, self.dry_run) {
            (_, true) => OutputMode::Preview,
            (Some(dir), false) => OutputMode::BackupDir(dir.clone()),
            (None, false) => OutputMode::InPlace,
        }
    }

    pub fn to_options(&self) -> ConvertOptions {
        let non_empty = |names: &Vec<String>| (!names.is_empty()).then(|| names.clone());

        ConvertOptions {
            exclude: self.exclude.clone(),
            include: non_empty(&self.include),
            only_change: non_empty(&self.only_change),
            exclude_dirs: self.exclude_dirs(),
            manifest_name: self.manifest_name.clone(),
            output: self.output(),
            formatter: self.formatter.clone(),
            update_command: self.update_command.clone(),
            keep_going: self.keep_going,
            ..ConvertOptions::new(self.action.into(), &self.dir)
        }
    }
}

/// Runs a conversion and prints its summary.
///
/// Fails when any package failed, even in `--keep-going` mode.
pub fn execute(args: ConvertArgs) -> Result<()> {
    let report = convert(&args.to_options())?;
    report.print_summary();

    if !report.is_success() {
        return Err(LinkError::Other(anyhow::anyhow!(
            "{} of {} package(s) failed",
            report.failures.len(),
            report.failures.len() + report.changes.len()
        )));
    }

    Ok(())
}
