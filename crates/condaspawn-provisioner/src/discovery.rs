//! Conda environment discovery: find a user's notebook-capable environments
//! under `~/.conda/envs`.
//!
//! An environment qualifies when `conda-meta/` holds an `ipython-notebook-*`
//! package record, i.e. the notebook stack was installed into it.

use std::fs;
use std::path::{Path, PathBuf};

use condaspawn_core::layout::{UserLayout, ENV_NAME_SUFFIX};
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// Directory inside an environment holding conda's package records.
pub const CONDA_META_DIR: &str = "conda-meta";

/// Package record prefix marking a notebook-capable environment.
pub const NOTEBOOK_MARKER_PREFIX: &str = "ipython-notebook-";

/// One discovered environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    /// `<env dir name>-conda`; used for display and for generated directory names.
    pub name: String,
    /// `<env>/bin/python`
    pub interpreter: PathBuf,
}

impl EnvironmentRecord {
    pub fn from_env_dir(env_dir: &Path) -> Option<Self> {
        let base = env_dir.file_name()?.to_str()?;
        Some(Self {
            name: format!("{}{}", base, ENV_NAME_SUFFIX),
            interpreter: env_dir.join("bin").join("python"),
        })
    }

    /// Directory holding the interpreter, prepended to PATH in the kernel descriptor.
    pub fn bin_dir(&self) -> &Path {
        self.interpreter.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Discover the user's notebook-capable conda environments.
///
/// Hidden entries and plain files are skipped. Order follows the directory
/// listing unless `sort` is set. A missing `~/.conda/envs` is
/// [`ProvisionError::NotFound`]; callers decide whether that means "none".
pub fn discover_environments(layout: &UserLayout, sort: bool) -> Result<Vec<EnvironmentRecord>> {
    let envs_root = layout.conda_envs_root();
    let entries = fs::read_dir(&envs_root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProvisionError::NotFound {
                path: envs_root.clone(),
            }
        } else {
            ProvisionError::io("read conda envs", &envs_root, e)
        }
    })?;

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProvisionError::io("read conda envs", &envs_root, e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(
                "Skipping environment with non-UTF-8 name: {}",
                entry.path().display()
            );
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let env_dir = entry.path();
        if !env_dir.is_dir() {
            continue;
        }
        if !has_notebook_marker(&env_dir) {
            tracing::debug!("No notebook marker in {}, skipping", env_dir.display());
            continue;
        }
        if let Some(record) = EnvironmentRecord::from_env_dir(&env_dir) {
            records.push(record);
        }
    }

    if sort {
        records.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(records)
}

/// `<env>/conda-meta/ipython-notebook-*` exists.
pub fn has_notebook_marker(env_dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(env_dir.join(CONDA_META_DIR)) else {
        return false;
    };
    entries.flatten().any(|e| {
        e.file_name()
            .to_str()
            .is_some_and(|n| n.starts_with(NOTEBOOK_MARKER_PREFIX))
    })
}
