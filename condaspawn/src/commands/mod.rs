//! CLI commands. Each drives the provisioner directly, without a hub.
//!
//! State files hold the same JSON object a host spawner would persist, so a
//! file written by `provision` can be fed to `teardown` or loaded by a host.

pub mod config;
pub mod discover;
pub mod kernel_json;
pub mod provision;
pub mod teardown;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use condaspawn_core::config::ProvisionerConfig;
use condaspawn_core::layout::normalize_home_root;
use condaspawn_provisioner::StateMap;

/// Environment-derived config with the CLI's `--home-root` applied.
pub fn load_config(home_root: Option<PathBuf>) -> ProvisionerConfig {
    let mut config = ProvisionerConfig::from_env();
    if let Some(root) = home_root {
        config.home_root = normalize_home_root(&root);
    }
    config
}

pub(crate) fn read_state_file(path: &Path) -> Result<StateMap> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("State file {} is not a JSON object", path.display()))
}

pub(crate) fn write_state_file(path: &Path, state: &StateMap) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, format!("{}\n", json))
        .with_context(|| format!("Failed to write state file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        let mut state = StateMap::new();
        state.insert("kernel_paths".to_string(), json!(["/home/a/.ipython/kernels/AUTO_x-conda"]));

        write_state_file(&path, &state).unwrap();
        assert_eq!(read_state_file(&path).unwrap(), state);
    }

    #[test]
    fn test_state_file_rejects_non_object() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(read_state_file(&path).is_err());
    }

    #[test]
    fn test_home_root_override() {
        let config = load_config(Some(PathBuf::from("/srv/users")));
        assert_eq!(config.home_root, PathBuf::from("/srv/users"));
    }
}
