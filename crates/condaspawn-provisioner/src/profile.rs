//! Parallel-computing profiles: `~/.ipython/profile_<env>/`.
//!
//! The directory is scaffolded by `ipython profile create --parallel`, then
//! `ipcluster_config.py` gets one appended line pinning the engine launcher
//! to the environment's interpreter.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use condaspawn_core::layout::UserLayout;

use crate::command::run_with_timeout;
use crate::discovery::EnvironmentRecord;
use crate::error::{ProvisionError, Result};

pub const IPCLUSTER_CONFIG_FILE: &str = "ipcluster_config.py";

/// Module each parallel engine runs.
pub const ENGINE_MODULE: &str = "IPython.parallel.engine";

/// Longest stderr excerpt carried in a tooling error.
const STDERR_EXCERPT_CHARS: usize = 2000;

/// Extension point for populating a profile directory.
///
/// The default [`CommandScaffolder`] shells out to IPython; tests and hosts
/// without IPython on PATH can plug in their own.
pub trait ProfileScaffolder: Send + Sync {
    /// Name for logging and diagnostics.
    fn name(&self) -> &str;

    /// Populate `profile_dir` as a parallel profile.
    fn scaffold(&self, profile_dir: &Path) -> Result<()>;
}

/// `<program> profile create --parallel --profile-dir <dir>` under a timeout.
#[derive(Debug, Clone)]
pub struct CommandScaffolder {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl CommandScaffolder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command_line(&self, profile_dir: &Path) -> String {
        format!(
            "{} profile create --parallel --profile-dir {}",
            self.program.display(),
            profile_dir.display()
        )
    }
}

impl ProfileScaffolder for CommandScaffolder {
    fn name(&self) -> &str {
        "ipython"
    }

    fn scaffold(&self, profile_dir: &Path) -> Result<()> {
        let command = self.command_line(profile_dir);
        tracing::debug!("Running `{}`", command);

        let mut cmd = Command::new(&self.program);
        cmd.args(["profile", "create", "--parallel", "--profile-dir"])
            .arg(profile_dir);
        let out = run_with_timeout(&mut cmd, self.timeout).map_err(|e| ProvisionError::Tooling {
            command: command.clone(),
            status: "failed to start".to_string(),
            stderr: e.to_string(),
        })?;

        if out.timed_out() {
            return Err(ProvisionError::Tooling {
                command,
                status: format!("timed out after {:?}", self.timeout),
                stderr: excerpt(&out.stderr),
            });
        }
        if !out.success() {
            let status = out
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown status".to_string());
            return Err(ProvisionError::Tooling {
                command,
                status,
                stderr: excerpt(&out.stderr),
            });
        }
        tracing::debug!(
            "Scaffolded {} in {} ms",
            profile_dir.display(),
            out.elapsed.as_millis()
        );
        Ok(())
    }
}

fn excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// `c.LocalEngineLauncher.engine_cmd = ['<python>', '-m', 'IPython.parallel.engine']`
pub fn engine_override_line(interpreter: &Path) -> String {
    format!(
        "c.LocalEngineLauncher.engine_cmd = ['{}', '-m', '{}']",
        interpreter.display(),
        ENGINE_MODULE
    )
}

/// Scaffold `profile_<name>/` and append the engine override.
pub fn write_profile_descriptor(
    layout: &UserLayout,
    record: &EnvironmentRecord,
    scaffolder: &dyn ProfileScaffolder,
) -> Result<PathBuf> {
    let profile_dir = layout.profile_dir(&record.name);
    scaffolder.scaffold(&profile_dir)?;

    // The scaffolder owns the directory contents, but the override must land
    // even when it wrote nothing.
    fs::create_dir_all(&profile_dir)
        .map_err(|e| ProvisionError::io("create profile dir", &profile_dir, e))?;
    let config_file = profile_dir.join(IPCLUSTER_CONFIG_FILE);
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config_file)
        .map_err(|e| ProvisionError::io("open ipcluster config", &config_file, e))?;
    write!(f, "\n{}", engine_override_line(&record.interpreter))
        .map_err(|e| ProvisionError::io("append ipcluster config", &config_file, e))?;
    tracing::debug!("Appended engine override to {}", config_file.display());
    Ok(profile_dir)
}

/// One profile directory per record, in input order. Stops at the first failure.
pub fn generate_profile_descriptors(
    layout: &UserLayout,
    records: &[EnvironmentRecord],
    scaffolder: &dyn ProfileScaffolder,
) -> Result<Vec<PathBuf>> {
    records
        .iter()
        .map(|record| write_profile_descriptor(layout, record, scaffolder))
        .collect()
}
