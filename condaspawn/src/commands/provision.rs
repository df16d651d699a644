use std::path::Path;

use anyhow::{Context, Result};
use condaspawn_core::config::{ProvisionerConfig, ScaffoldFailurePolicy};
use condaspawn_provisioner::{Provisioner, StateMap, UserContext};

use super::write_state_file;

/// `condaspawn provision`
pub fn cmd_provision(
    mut config: ProvisionerConfig,
    user: &str,
    group: Option<&str>,
    state_file: Option<&Path>,
    skip_failures: bool,
    no_chown: bool,
) -> Result<()> {
    if skip_failures {
        config.scaffold_failure = ScaffoldFailurePolicy::Skip;
    }
    if no_chown {
        config.fix_ownership = false;
    }

    let mut ctx = UserContext::new(user);
    if let Some(g) = group {
        ctx = ctx.with_group(g);
    }

    let provisioner = Provisioner::new(config);
    let provisioned = provisioner
        .provision(&ctx)
        .with_context(|| format!("Provisioning failed for {}", user))?;

    for env in &provisioned.environments {
        eprintln!("  + {} ({})", env.name, env.interpreter.display());
    }
    for name in &provisioned.skipped {
        eprintln!("  - {} (profile scaffolding failed)", name);
    }

    if let Some(path) = state_file {
        let mut state = StateMap::new();
        provisioned.state.merge_into(&mut state);
        write_state_file(path, &state)?;
        tracing::info!("State written to {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&provisioned.state)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::commands::read_state_file;
    use condaspawn_provisioner::state::{KERNEL_PATHS_KEY, PROFILE_PATHS_KEY};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    pub(crate) fn make_env(home_root: &Path, user: &str, env: &str) -> PathBuf {
        let dir = home_root.join(user).join(".conda/envs").join(env);
        fs::create_dir_all(dir.join("conda-meta")).unwrap();
        fs::write(dir.join("conda-meta/ipython-notebook-2.3.1-py34_0.json"), "{}").unwrap();
        dir
    }

    fn fake_ipython(dir: &Path) -> PathBuf {
        let tool = dir.join("ipython");
        fs::write(
            &tool,
            "#!/bin/sh\nmkdir -p \"$5\" && echo 'c = get_config()' > \"$5/ipcluster_config.py\"\n",
        )
        .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        tool
    }

    #[test]
    fn test_provision_writes_descriptors_and_state() {
        let tmp = tempfile::tempdir().unwrap();
        let homes = tmp.path().join("homes");
        let env = make_env(&homes, "alice", "myenv");
        let mut config = ProvisionerConfig::with_home_root(&homes);
        config.ipython = fake_ipython(tmp.path());
        config.scaffold_timeout = Duration::from_secs(10);
        let state_file = tmp.path().join("alice.json");

        cmd_provision(config, "alice", None, Some(&state_file), false, true).unwrap();

        let kernel_json = homes.join("alice/.ipython/kernels/AUTO_myenv-conda/kernel.json");
        let kernel = fs::read_to_string(&kernel_json).unwrap();
        assert!(kernel.contains(&env.join("bin/python").to_string_lossy().into_owned()));
        let ipcluster = homes.join("alice/.ipython/profile_myenv-conda/ipcluster_config.py");
        let ipcluster = fs::read_to_string(ipcluster).unwrap();
        assert!(ipcluster.starts_with("c = get_config()\n"));
        assert!(ipcluster.contains("c.LocalEngineLauncher.engine_cmd"));

        let state = read_state_file(&state_file).unwrap();
        assert_eq!(
            state.get(KERNEL_PATHS_KEY),
            Some(&serde_json::json!([homes
                .join("alice/.ipython/kernels/AUTO_myenv-conda")
                .to_string_lossy()]))
        );
        assert!(state.contains_key(PROFILE_PATHS_KEY));
    }

    #[test]
    fn test_provision_failing_tool_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        make_env(tmp.path(), "alice", "myenv");
        let mut config = ProvisionerConfig::with_home_root(tmp.path());
        config.ipython = PathBuf::from("/bin/false");
        let state_file = tmp.path().join("alice.json");

        assert!(cmd_provision(config, "alice", None, Some(&state_file), false, true).is_err());
        assert!(!state_file.exists());
        assert!(!tmp.path().join("alice/.ipython/kernels/AUTO_myenv-conda").exists());
    }
}
