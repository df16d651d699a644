use std::path::Path;

use anyhow::{bail, Result};
use condaspawn_core::config::ProvisionerConfig;
use condaspawn_provisioner::state::{KERNEL_PATHS_KEY, PROFILE_PATHS_KEY};
use condaspawn_provisioner::{Provisioner, ProvisionerState, StateMap, TeardownReport};

use super::{read_state_file, write_state_file};

/// `condaspawn teardown`
///
/// Rewrites the state file so only paths that failed to delete remain.
pub fn cmd_teardown(config: ProvisionerConfig, state_file: &Path, user: Option<&str>) -> Result<()> {
    let mut map = read_state_file(state_file)?;
    let mut state = ProvisionerState::default();
    state.load_from(&map);

    let report = Provisioner::new(config).teardown(user, &state);
    replace_paths(&mut map, &report.remaining);
    write_state_file(state_file, &map)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    check_report(&report)
}

fn replace_paths(map: &mut StateMap, remaining: &ProvisionerState) {
    map.remove(KERNEL_PATHS_KEY);
    map.remove(PROFILE_PATHS_KEY);
    remaining.merge_into(map);
}

fn check_report(report: &TeardownReport) -> Result<()> {
    if !report.failed.is_empty() {
        bail!(
            "{} path(s) could not be removed; they stay in the state file",
            report.failed.len()
        );
    }
    Ok(())
}
