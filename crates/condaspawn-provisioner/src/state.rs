//! Provisioner state persisted through the host's key/value state contract.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot format shared with the host spawner.
pub type StateMap = serde_json::Map<String, Value>;

pub const KERNEL_PATHS_KEY: &str = "kernel_paths";
pub const PROFILE_PATHS_KEY: &str = "profile_paths";

/// Directories generated by the last start, consumed by stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerState {
    #[serde(default)]
    pub kernel_paths: Vec<PathBuf>,
    #[serde(default)]
    pub profile_paths: Vec<PathBuf>,
}

impl ProvisionerState {
    pub fn is_empty(&self) -> bool {
        self.kernel_paths.is_empty() && self.profile_paths.is_empty()
    }

    /// Add this state's keys to `state`; empty lists are left out.
    pub fn merge_into(&self, state: &mut StateMap) {
        if !self.kernel_paths.is_empty() {
            state.insert(KERNEL_PATHS_KEY.to_string(), paths_to_value(&self.kernel_paths));
        }
        if !self.profile_paths.is_empty() {
            state.insert(
                PROFILE_PATHS_KEY.to_string(),
                paths_to_value(&self.profile_paths),
            );
        }
    }

    /// Replace each list whose key is present in `state`. Absent keys leave
    /// the list as it is; a malformed value is logged and ignored.
    pub fn load_from(&mut self, state: &StateMap) {
        if let Some(v) = state.get(KERNEL_PATHS_KEY) {
            if let Some(paths) = value_to_paths(KERNEL_PATHS_KEY, v) {
                self.kernel_paths = paths;
            }
        }
        if let Some(v) = state.get(PROFILE_PATHS_KEY) {
            if let Some(paths) = value_to_paths(PROFILE_PATHS_KEY, v) {
                self.profile_paths = paths;
            }
        }
    }

    pub fn clear(&mut self) {
        self.kernel_paths.clear();
        self.profile_paths.clear();
    }
}

fn paths_to_value(paths: &[PathBuf]) -> Value {
    Value::Array(
        paths
            .iter()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .collect(),
    )
}

fn value_to_paths(key: &str, value: &Value) -> Option<Vec<PathBuf>> {
    match serde_json::from_value::<Vec<PathBuf>>(value.clone()) {
        Ok(paths) => Some(paths),
        Err(e) => {
            tracing::warn!("Ignoring malformed '{}' in spawner state: {}", key, e);
            None
        }
    }
}
