use anyhow::Result;
use condaspawn_core::config::ProvisionerConfig;
use condaspawn_provisioner::Provisioner;

/// `condaspawn discover`
pub fn cmd_discover(config: ProvisionerConfig, user: &str, json: bool) -> Result<()> {
    let provisioner = Provisioner::new(config);
    let envs = provisioner.discover(user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&envs)?);
        return Ok(());
    }
    if envs.is_empty() {
        eprintln!("No notebook-capable conda environments for {}", user);
        return Ok(());
    }
    for env in &envs {
        println!("{}\t{}", env.name, env.interpreter.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::provision::tests::make_env;

    #[test]
    fn test_discover_lists_marked_envs() {
        let tmp = tempfile::tempdir().unwrap();
        make_env(tmp.path(), "alice", "myenv");
        let config = ProvisionerConfig::with_home_root(tmp.path());

        let envs = Provisioner::new(config.clone()).discover("alice").unwrap();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].name, "myenv-conda");
        cmd_discover(config.clone(), "alice", false).unwrap();
        cmd_discover(config, "alice", true).unwrap();
    }

    #[test]
    fn test_discover_user_without_envs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ProvisionerConfig::with_home_root(tmp.path());
        cmd_discover(config, "nobody", false).unwrap();
    }
}
