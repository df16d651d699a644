use anyhow::Result;
use condaspawn_core::config::ProvisionerConfig;

/// `condaspawn config`
pub fn cmd_config(config: &ProvisionerConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
