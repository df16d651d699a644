//! Spawner decorator: provisions conda kernels around a host base spawner.
//!
//! The host hands out one spawner per user and drives it through
//! [`Spawner`]. [`CondaSpawner`] wraps any base implementation, runs the
//! provisioning pipeline before delegating `start`, and tears the generated
//! directories down before delegating `stop`. Its own state rides along in
//! the base spawner's snapshot under `kernel_paths` / `profile_paths`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::info_log;
use crate::provisioner::{Provisioner, UserContext};
use crate::state::{ProvisionerState, StateMap};

/// Where the started single-user server can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub ip: String,
    pub port: u16,
}

/// The host's base spawner contract.
///
/// `get_state` / `load_state` / `clear_state` persist spawner state across
/// hub restarts; `start` / `stop` manage the user's server process.
#[async_trait]
pub trait Spawner: Send {
    fn get_state(&self) -> StateMap;

    fn load_state(&mut self, state: &StateMap);

    fn clear_state(&mut self);

    async fn start(&mut self, user: &UserContext) -> anyhow::Result<ConnectionInfo>;

    async fn stop(&mut self, now: bool) -> anyhow::Result<()>;
}

/// Conda-aware decorator over a base spawner `S`.
#[derive(Debug)]
pub struct CondaSpawner<S> {
    base: S,
    provisioner: Provisioner,
    state: ProvisionerState,
    /// The account this spawner serves. Teardown only deletes its paths.
    user: String,
}

impl<S: Spawner> CondaSpawner<S> {
    /// A spawner is always built for one user, also when the hub restores it
    /// from its database before any start.
    pub fn new(base: S, provisioner: Provisioner, user: impl Into<String>) -> Self {
        Self {
            base,
            provisioner,
            state: ProvisionerState::default(),
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn state(&self) -> &ProvisionerState {
        &self.state
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut S {
        &mut self.base
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Provision on a blocking worker, then delegate to the base `start`.
    ///
    /// The base spawner is only called once every descriptor is on disk and
    /// owned by the user; any provisioning failure is returned instead.
    pub async fn provision_and_start(&mut self, user: &UserContext) -> Result<ConnectionInfo> {
        if user.name != self.user {
            return Err(ProvisionError::UserMismatch {
                expected: self.user.clone(),
                found: user.name.clone(),
            });
        }
        let provisioner = self.provisioner.clone();
        let ctx = user.clone();
        let provisioned = tokio::task::spawn_blocking(move || provisioner.provision(&ctx)).await??;

        self.state = provisioned.state;
        info_log!(
            "Starting server for {} with {} conda kernel(s)",
            user.name,
            self.state.kernel_paths.len()
        );
        self.base.start(user).await.map_err(ProvisionError::Host)
    }

    /// Remove recorded directories on a blocking worker, then delegate to the
    /// base `stop`. Cleanup problems are logged, never returned; paths that
    /// could not be deleted stay recorded for the next stop.
    pub async fn teardown_and_stop(&mut self, now: bool) -> Result<()> {
        if !self.state.is_empty() {
            let provisioner = self.provisioner.clone();
            let user = self.user.clone();
            let state = self.state.clone();
            match tokio::task::spawn_blocking(move || provisioner.teardown(Some(&user), &state))
                .await
            {
                Ok(report) => self.state = report.remaining,
                Err(e) => tracing::error!("Teardown worker failed: {}", e),
            }
        }
        self.base.stop(now).await.map_err(ProvisionError::Host)
    }
}

#[async_trait]
impl<S: Spawner> Spawner for CondaSpawner<S> {
    fn get_state(&self) -> StateMap {
        let mut state = self.base.get_state();
        self.state.merge_into(&mut state);
        state
    }

    fn load_state(&mut self, state: &StateMap) {
        self.base.load_state(state);
        self.state.load_from(state);
    }

    fn clear_state(&mut self) {
        self.base.clear_state();
        self.state.clear();
    }

    async fn start(&mut self, user: &UserContext) -> anyhow::Result<ConnectionInfo> {
        Ok(self.provision_and_start(user).await?)
    }

    async fn stop(&mut self, now: bool) -> anyhow::Result<()> {
        Ok(self.teardown_and_stop(now).await?)
    }
}
