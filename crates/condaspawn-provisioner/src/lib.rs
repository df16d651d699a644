//! Per-user conda environment provisioning for a notebook hub.
//!
//! [`Provisioner`] discovers a user's notebook-capable conda environments and
//! generates a kernel descriptor and a parallel profile for each;
//! [`CondaSpawner`] wires that around any base [`Spawner`].

#[cfg(not(unix))]
compile_error!("condaspawn-provisioner relies on Unix users, groups and lchown");

pub mod command;
pub mod discovery;
pub mod error;
pub mod kernel;
pub mod log;
pub mod ownership;
pub mod profile;
pub mod provisioner;
pub mod spawner;
pub mod state;

pub use discovery::EnvironmentRecord;
pub use error::{ProvisionError, Result};
pub use profile::{CommandScaffolder, ProfileScaffolder};
pub use provisioner::{Provisioned, Provisioner, TeardownReport, UserContext};
pub use spawner::{CondaSpawner, ConnectionInfo, Spawner};
pub use state::{ProvisionerState, StateMap};
