//! Per-user filesystem layout.
//!
//! Everything condaspawn reads or writes for a user lives under
//! `<home_root>/<user>`:
//!
//! ```text
//! ~/.conda/envs/<env>/                      discovered environments
//! ~/.ipython/kernels/AUTO_<env>-conda/      generated kernel descriptors
//! ~/.ipython/profile_<env>-conda/           generated parallel profiles
//! ```

use std::path::{Component, Path, PathBuf};

/// Prefix of generated kernel directories; user-made kernels never carry it.
pub const KERNEL_DIR_PREFIX: &str = "AUTO_";

/// Prefix of profile directories (IPython's own naming).
pub const PROFILE_DIR_PREFIX: &str = "profile_";

/// Appended to an environment directory's name to form its kernel/profile name.
pub const ENV_NAME_SUFFIX: &str = "-conda";

/// Absolute, lexically clean form of a configured home root: relative roots
/// are joined to the working directory, `.` is dropped and `..` folded.
/// Symlinks are not resolved, so the root need not exist yet.
pub fn normalize_home_root(root: &Path) -> PathBuf {
    let absolute = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(root))
            .unwrap_or_else(|_| root.to_path_buf())
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Paths for one user, derived from the configured home root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLayout {
    user: String,
    home: PathBuf,
}

impl UserLayout {
    pub fn new(home_root: &Path, user: &str) -> Self {
        Self {
            user: user.to_string(),
            home: normalize_home_root(home_root).join(user),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `~/.conda/envs`
    pub fn conda_envs_root(&self) -> PathBuf {
        self.home.join(".conda").join("envs")
    }

    /// `~/.ipython`
    pub fn ipython_dir(&self) -> PathBuf {
        self.home.join(".ipython")
    }

    /// `~/.ipython/kernels`
    pub fn kernels_dir(&self) -> PathBuf {
        self.ipython_dir().join("kernels")
    }

    /// `~/.ipython/kernels/AUTO_<name>`
    pub fn kernel_dir(&self, env_name: &str) -> PathBuf {
        self.kernels_dir()
            .join(format!("{}{}", KERNEL_DIR_PREFIX, env_name))
    }

    /// `~/.ipython/profile_<name>`
    pub fn profile_dir(&self, env_name: &str) -> PathBuf {
        self.ipython_dir()
            .join(format!("{}{}", PROFILE_DIR_PREFIX, env_name))
    }
}
