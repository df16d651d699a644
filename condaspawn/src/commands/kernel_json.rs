use std::path::PathBuf;

use anyhow::Result;
use condaspawn_core::config::ProvisionerConfig;
use condaspawn_provisioner::kernel::KernelDescriptor;
use condaspawn_provisioner::EnvironmentRecord;

/// `condaspawn kernel-json`
pub fn cmd_kernel_json(
    config: &ProvisionerConfig,
    name: &str,
    python: PathBuf,
    inherited_path: Option<&str>,
) -> Result<()> {
    let record = EnvironmentRecord {
        name: name.to_string(),
        interpreter: python,
    };
    let inherited = inherited_path.unwrap_or(&config.inherited_path);
    let descriptor = KernelDescriptor::for_environment(&record, inherited);
    println!("{}", descriptor.to_json()?);
    Ok(())
}
