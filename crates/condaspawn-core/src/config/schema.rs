//! Configuration structs grouped by concern.
//!
//! Loaded from environment variables with the shared fallback rules.

use super::env_keys::{observability as obv_keys, paths, pipeline, scaffold};
use super::loader::{env_bool, env_optional, env_or};
use crate::layout::normalize_home_root;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Parent directory of all user homes; `<home_root>/<user>` is a user's home.
pub const DEFAULT_HOME_ROOT: &str = "/home";

/// Profile scaffolding executable.
pub const DEFAULT_IPYTHON: &str = "ipython";

/// Seconds before a hung `ipython profile create` is killed.
pub const DEFAULT_SCAFFOLD_TIMEOUT_SECS: u64 = 120;

/// Used when the hosting process has no PATH of its own.
pub const DEFAULT_INHERITED_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// What to do when profile scaffolding fails for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaffoldFailurePolicy {
    /// Fail the whole start.
    #[default]
    Abort,
    /// Drop that environment (kernel included) and keep going.
    Skip,
}

impl FromStr for ScaffoldFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" | "fail" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "invalid scaffold failure policy '{}' (expected 'abort' or 'skip')",
                other
            )),
        }
    }
}

impl fmt::Display for ScaffoldFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

/// Provisioning pipeline configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionerConfig {
    pub home_root: PathBuf,
    /// Executable invoked as `<ipython> profile create --parallel --profile-dir <dir>`.
    pub ipython: PathBuf,
    #[serde(serialize_with = "serialize_secs")]
    pub scaffold_timeout: Duration,
    pub scaffold_failure: ScaffoldFailurePolicy,
    /// Sort discovered environments by name instead of keeping listing order.
    pub sort_environments: bool,
    pub fix_ownership: bool,
    /// PATH appended after the interpreter directory in kernel descriptors.
    /// Captured once here; generators never read the process environment.
    pub inherited_path: String,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            home_root: PathBuf::from(DEFAULT_HOME_ROOT),
            ipython: PathBuf::from(DEFAULT_IPYTHON),
            scaffold_timeout: Duration::from_secs(DEFAULT_SCAFFOLD_TIMEOUT_SECS),
            scaffold_failure: ScaffoldFailurePolicy::Abort,
            sort_environments: false,
            fix_ownership: true,
            inherited_path: DEFAULT_INHERITED_PATH.to_string(),
        }
    }
}

impl ProvisionerConfig {
    /// Load from environment variables (reads `.env` first).
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let home_root = env_or(paths::CONDASPAWN_HOME_ROOT, || {
            DEFAULT_HOME_ROOT.to_string()
        });
        let ipython = env_or(scaffold::CONDASPAWN_IPYTHON, || {
            DEFAULT_IPYTHON.to_string()
        });
        let scaffold_timeout = env_optional(scaffold::CONDASPAWN_SCAFFOLD_TIMEOUT_SECS)
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SCAFFOLD_TIMEOUT_SECS);
        let scaffold_failure = match env_optional(scaffold::CONDASPAWN_SCAFFOLD_FAILURE) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}; falling back to abort", e);
                ScaffoldFailurePolicy::Abort
            }),
            None => ScaffoldFailurePolicy::Abort,
        };
        let inherited_path = env_or(paths::PATH, || DEFAULT_INHERITED_PATH.to_string());

        Self {
            home_root: normalize_home_root(Path::new(&home_root)),
            ipython: PathBuf::from(ipython),
            scaffold_timeout: Duration::from_secs(scaffold_timeout),
            scaffold_failure,
            sort_environments: env_bool(pipeline::CONDASPAWN_SORT_ENVS, false),
            fix_ownership: env_bool(pipeline::CONDASPAWN_FIX_OWNERSHIP, true),
            inherited_path,
        }
    }

    /// Same defaults, rooted at another home directory parent. The root is
    /// normalised so generated paths never carry `.` or `..`.
    pub fn with_home_root(home_root: impl Into<PathBuf>) -> Self {
        Self {
            home_root: normalize_home_root(&home_root.into()),
            ..Self::default()
        }
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// Observability: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::CONDASPAWN_QUIET, false),
                log_level: env_or(obv_keys::CONDASPAWN_LOG_LEVEL, || {
                    "condaspawn=info".to_string()
                }),
                log_json: env_bool(obv_keys::CONDASPAWN_LOG_JSON, false),
            }
        })
    }
}
