//! The provisioning pipeline and its teardown.
//!
//! `provision`: discover → kernel descriptors → profiles → ownership.
//! `teardown`: best-effort removal of everything a previous provision recorded.
//! Both are blocking; the spawner runs them on a blocking worker.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use condaspawn_core::config::{ProvisionerConfig, ScaffoldFailurePolicy};
use condaspawn_core::layout::UserLayout;
use condaspawn_core::path_validation::{artifact_owner, validate_artifact_path};
use serde::{Deserialize, Serialize};

use crate::discovery::{discover_environments, EnvironmentRecord};
use crate::error::{ProvisionError, Result};
use crate::info_log;
use crate::kernel::generate_kernel_descriptors;
use crate::profile::{
    generate_profile_descriptors, write_profile_descriptor, CommandScaffolder, ProfileScaffolder,
};
use crate::state::ProvisionerState;

/// The system account a spawner runs for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub name: String,
    /// Group for the ownership fix; the user's own name when unset.
    #[serde(default)]
    pub group: Option<String>,
}

impl UserContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.name)
    }
}

/// Result of a successful provision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub environments: Vec<EnvironmentRecord>,
    pub state: ProvisionerState,
    /// Environments dropped because scaffolding failed (skip policy only).
    pub skipped: Vec<String>,
}

/// Outcome of a teardown; nothing in here is fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub removed: Vec<PathBuf>,
    /// Already gone before teardown ran.
    pub missing: Vec<PathBuf>,
    /// Not a generated path of this user; left alone and forgotten.
    pub refused: Vec<PathBuf>,
    /// Deletion failed; kept in `remaining` for the next attempt.
    pub failed: Vec<(PathBuf, String)>,
    pub remaining: ProvisionerState,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.refused.is_empty()
    }
}

#[derive(Clone)]
pub struct Provisioner {
    config: ProvisionerConfig,
    scaffolder: Arc<dyn ProfileScaffolder>,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("config", &self.config)
            .field("scaffolder", &self.scaffolder.name())
            .finish()
    }
}

impl Provisioner {
    /// Provisioner scaffolding profiles with the configured `ipython`.
    pub fn new(config: ProvisionerConfig) -> Self {
        let scaffolder = CommandScaffolder::new(config.ipython.clone(), config.scaffold_timeout);
        Self::with_scaffolder(config, Arc::new(scaffolder))
    }

    pub fn with_scaffolder(config: ProvisionerConfig, scaffolder: Arc<dyn ProfileScaffolder>) -> Self {
        Self { config, scaffolder }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    pub fn layout(&self, user: &str) -> UserLayout {
        UserLayout::new(&self.config.home_root, user)
    }

    /// Discover the user's environments; a user without `~/.conda/envs` has none.
    pub fn discover(&self, user: &str) -> Result<Vec<EnvironmentRecord>> {
        let layout = self.layout(user);
        match discover_environments(&layout, self.config.sort_environments) {
            Ok(envs) => Ok(envs),
            Err(ProvisionError::NotFound { path }) => {
                tracing::debug!("{} does not exist; no conda environments", path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the whole pipeline for `user`. Fails on the first error unless the
    /// skip policy is configured and the error is a scaffolding failure.
    ///
    /// On failure the kernel and profile directories this call created are
    /// removed again, since no state is recorded for a failed start.
    /// Directories that already existed are left in place.
    pub fn provision(&self, user: &UserContext) -> Result<Provisioned> {
        let layout = self.layout(&user.name);
        let environments = self.discover(&user.name)?;
        for env in &environments {
            validate_artifact_path(&layout, &layout.kernel_dir(&env.name))?;
            validate_artifact_path(&layout, &layout.profile_dir(&env.name))?;
        }

        // Directories from an earlier start may still be recorded by a running
        // server; only what this call creates is rolled back.
        let created: Vec<PathBuf> = environments
            .iter()
            .flat_map(|env| [layout.kernel_dir(&env.name), layout.profile_dir(&env.name)])
            .filter(|dir| !dir.exists())
            .collect();

        match self.generate(&layout, user, environments) {
            Ok(provisioned) => Ok(provisioned),
            Err(e) => {
                tracing::error!("Provisioning for {} failed: {}", user.name, e);
                for dir in &created {
                    remove_if_present(dir);
                }
                Err(e)
            }
        }
    }

    fn generate(
        &self,
        layout: &UserLayout,
        user: &UserContext,
        environments: Vec<EnvironmentRecord>,
    ) -> Result<Provisioned> {
        let kernel_paths =
            generate_kernel_descriptors(layout, &environments, &self.config.inherited_path)?;

        let (environments, state, skipped) = match self.config.scaffold_failure {
            ScaffoldFailurePolicy::Abort => {
                let profile_paths =
                    generate_profile_descriptors(layout, &environments, self.scaffolder.as_ref())?;
                let state = ProvisionerState {
                    kernel_paths,
                    profile_paths,
                };
                (environments, state, Vec::new())
            }
            ScaffoldFailurePolicy::Skip => {
                self.profiles_skipping_failures(layout, environments, kernel_paths)?
            }
        };

        let ipython_dir = layout.ipython_dir();
        if self.config.fix_ownership && ipython_dir.exists() {
            crate::ownership::fix_ownership(&ipython_dir, &user.name, user.group())?;
        }

        info_log!(
            "Provisioned {} conda environment(s) for {}",
            environments.len(),
            user.name
        );
        Ok(Provisioned {
            environments,
            state,
            skipped,
        })
    }

    fn profiles_skipping_failures(
        &self,
        layout: &UserLayout,
        environments: Vec<EnvironmentRecord>,
        kernel_paths: Vec<PathBuf>,
    ) -> Result<(Vec<EnvironmentRecord>, ProvisionerState, Vec<String>)> {
        let mut kept = Vec::with_capacity(environments.len());
        let mut state = ProvisionerState::default();
        let mut skipped = Vec::new();

        for (env, kernel_path) in environments.into_iter().zip(kernel_paths) {
            match write_profile_descriptor(layout, &env, self.scaffolder.as_ref()) {
                Ok(profile_path) => {
                    state.kernel_paths.push(kernel_path);
                    state.profile_paths.push(profile_path);
                    kept.push(env);
                }
                Err(e @ ProvisionError::Tooling { .. }) => {
                    tracing::warn!("Skipping environment {}: {}", env.name, e);
                    remove_if_present(&kernel_path);
                    remove_if_present(&layout.profile_dir(&env.name));
                    skipped.push(env.name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((kept, state, skipped))
    }

    /// Delete every recorded kernel path, then every profile path.
    ///
    /// Never fails: missing paths count as removed, paths outside the
    /// generated layout are refused, other failures are reported and kept in
    /// `remaining`. With `user` unset the owner is taken from the path itself.
    pub fn teardown(&self, user: Option<&str>, state: &ProvisionerState) -> TeardownReport {
        let mut report = TeardownReport::default();

        let kernels = state.kernel_paths.iter().map(|p| (p, true));
        let profiles = state.profile_paths.iter().map(|p| (p, false));
        for (path, is_kernel) in kernels.chain(profiles) {
            let checked = match user {
                Some(name) => validate_artifact_path(&self.layout(name), path).map(|_| ()),
                None => artifact_owner(&self.config.home_root, path).map(|_| ()),
            };
            if let Err(e) = checked {
                tracing::warn!("Refusing to delete {}: {}", path.display(), e);
                report.refused.push(path.clone());
                continue;
            }

            match fs::remove_dir_all(path) {
                Ok(()) => {
                    tracing::debug!("Removed {}", path.display());
                    report.removed.push(path.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!("{} already removed", path.display());
                    report.missing.push(path.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed.push((path.clone(), e.to_string()));
                    if is_kernel {
                        report.remaining.kernel_paths.push(path.clone());
                    } else {
                        report.remaining.profile_paths.push(path.clone());
                    }
                }
            }
        }

        info_log!(
            "Teardown: {} removed, {} already gone, {} refused, {} failed",
            report.removed.len(),
            report.missing.len(),
            report.refused.len(),
            report.failed.len()
        );
        report
    }
}

fn remove_if_present(path: &std::path::Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
