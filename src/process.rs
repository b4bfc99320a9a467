//! External command execution.
//!
//! Used for the optional formatting pass over written manifests and for the
//! per-package environment update command. Failures here are logged by the
//! callers and never turn into conversion failures.

use crate::error::Result;
use crate::manifest::PackageRecord;
use std::path::Path;
use std::process::Command;

/// Marker printed by Poetry when an update has nothing to do.
const NOTHING_TO_UPDATE: &str = "No dependencies to install or update";

/// Captured result of a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` through the platform shell in `cwd`.
///
/// # Errors
///
/// `Io` if the shell cannot be spawned. A non-zero exit is not an error; see
/// [`CommandOutput::success`].
pub fn run_command(command: &str, cwd: &Path) -> Result<CommandOutput> {
    log::debug!("Running `{}` in {}", command, cwd.display());

    let output = shell(command).current_dir(cwd).output()?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Runs `<formatter> <file>` in the file's directory. Returns `true` on success.
pub fn run_formatter(formatter: &str, file: &Path) -> bool {
    let cwd = file.parent().unwrap_or(Path::new("."));
    let command = format!("{} \"{}\"", formatter, file.display());

    match run_command(&command, cwd) {
        Ok(output) if output.success => true,
        Ok(output) => {
            log::warn!(
                "Formatter `{}` failed on {} (exit {:?}): {}",
                formatter,
                file.display(),
                output.code,
                output.stderr.trim()
            );
            false
        }
        Err(e) => {
            log::warn!("Could not run formatter `{}`: {}", formatter, e);
            false
        }
    }
}

/// Runs the environment update command for `package` in its directory.
///
/// Returns the command's stdout when an update was performed, `None` when
/// nothing needed updating or the command failed.
pub fn run_update(command: &str, package: &PackageRecord) -> Option<String> {
    match run_command(command, package.dir()) {
        Ok(output) if output.success => {
            if output.stdout.contains(NOTHING_TO_UPDATE) {
                log::info!("No dependencies to install or update for {}", package.name);
                return None;
            }
            log::info!("Updated environment for {} {}", package.name, package.version);
            Some(output.stdout)
        }
        Ok(output) => {
            log::warn!(
                "Update command failed for {} (exit {:?}): {}",
                package.name,
                output.code,
                output.stderr.trim()
            );
            None
        }
        Err(e) => {
            log::warn!("Could not run update command for {}: {}", package.name, e);
            None
        }
    }
}
