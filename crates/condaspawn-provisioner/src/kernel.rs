//! Kernel descriptors: `~/.ipython/kernels/AUTO_<env>/kernel.json`.
//!
//! The notebook frontend lists every directory under `kernels/` as a
//! launchable kernel and substitutes `{connection_file}` itself at launch.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use condaspawn_core::layout::UserLayout;
use serde::{Deserialize, Serialize};

use crate::discovery::EnvironmentRecord;
use crate::error::{ProvisionError, Result};

pub const KERNEL_FILE: &str = "kernel.json";

/// Placeholder the frontend replaces with the real connection file path.
pub const CONNECTION_FILE_TOKEN: &str = "{connection_file}";

/// Module started by the frontend for each kernel.
pub const KERNEL_MODULE: &str = "IPython.kernel";

const PATH_SEPARATOR: char = ':';

/// Contents of `kernel.json`. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelDescriptor {
    pub argv: Vec<String>,
    pub display_name: String,
    pub language: String,
    pub env: BTreeMap<String, String>,
}

impl KernelDescriptor {
    pub fn for_environment(record: &EnvironmentRecord, inherited_path: &str) -> Self {
        let mut env = BTreeMap::new();
        env.insert(
            "PATH".to_string(),
            search_path(record.bin_dir(), inherited_path),
        );
        Self {
            argv: vec![
                record.interpreter.to_string_lossy().into_owned(),
                "-m".to_string(),
                KERNEL_MODULE.to_string(),
                "-f".to_string(),
                CONNECTION_FILE_TOKEN.to_string(),
            ],
            display_name: record.name.clone(),
            language: "python".to_string(),
            env,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| ProvisionError::Serialize {
            what: "kernel descriptor",
            source,
        })
    }
}

/// `<bin_dir>:<inherited>`; the interpreter's directory always wins.
pub fn search_path(bin_dir: &Path, inherited_path: &str) -> String {
    let bin = bin_dir.to_string_lossy();
    if inherited_path.is_empty() {
        bin.into_owned()
    } else {
        format!("{}{}{}", bin, PATH_SEPARATOR, inherited_path)
    }
}

/// Create `AUTO_<name>/` if needed and (over)write its `kernel.json`.
pub fn write_kernel_descriptor(
    layout: &UserLayout,
    record: &EnvironmentRecord,
    inherited_path: &str,
) -> Result<PathBuf> {
    let kernel_dir = layout.kernel_dir(&record.name);
    fs::create_dir_all(&kernel_dir)
        .map_err(|e| ProvisionError::io("create kernel dir", &kernel_dir, e))?;

    let json = KernelDescriptor::for_environment(record, inherited_path).to_json()?;
    let kernel_file = kernel_dir.join(KERNEL_FILE);
    fs::write(&kernel_file, format!("{}\n", json))
        .map_err(|e| ProvisionError::io("write kernel descriptor", &kernel_file, e))?;
    tracing::debug!("Wrote {}", kernel_file.display());
    Ok(kernel_dir)
}

/// One kernel directory per record, in input order.
pub fn generate_kernel_descriptors(
    layout: &UserLayout,
    records: &[EnvironmentRecord],
    inherited_path: &str,
) -> Result<Vec<PathBuf>> {
    records
        .iter()
        .map(|record| write_kernel_descriptor(layout, record, inherited_path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(home: &Path) -> EnvironmentRecord {
        EnvironmentRecord {
            name: "myenv-conda".to_string(),
            interpreter: home.join(".conda/envs/myenv/bin/python"),
        }
    }

    #[test]
    fn test_kernel_descriptor_document() {
        let rec = EnvironmentRecord {
            name: "myenv-conda".to_string(),
            interpreter: PathBuf::from("/home/alice/.conda/envs/myenv/bin/python"),
        };
        let doc = KernelDescriptor::for_environment(&rec, "/usr/bin:/bin");
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "argv": [
                    "/home/alice/.conda/envs/myenv/bin/python",
                    "-m", "IPython.kernel", "-f", "{connection_file}"
                ],
                "display_name": "myenv-conda",
                "language": "python",
                "env": {"PATH": "/home/alice/.conda/envs/myenv/bin:/usr/bin:/bin"}
            })
        );
    }

    #[test]
    fn test_key_order_on_disk() {
        let rec = record(Path::new("/home/alice"));
        let json = KernelDescriptor::for_environment(&rec, "/bin").to_json().unwrap();
        let argv = json.find("\"argv\"").unwrap();
        let display = json.find("\"display_name\"").unwrap();
        let language = json.find("\"language\"").unwrap();
        let env = json.find("\"env\"").unwrap();
        assert!(argv < display && display < language && language < env);
    }

    #[test]
    fn test_search_path_empty_inherited() {
        assert_eq!(search_path(Path::new("/opt/env/bin"), ""), "/opt/env/bin");
    }

    #[test]
    fn test_generate_is_idempotent_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = UserLayout::new(tmp.path(), "alice");
        let rec = record(layout.home());

        let first = generate_kernel_descriptors(&layout, &[rec.clone()], "/bin").unwrap();
        assert_eq!(first, vec![layout.kernel_dir("myenv-conda")]);
        let kernel_file = first[0].join(KERNEL_FILE);
        let before = fs::read_to_string(&kernel_file).unwrap();

        fs::write(&kernel_file, "stale").unwrap();
        let second = generate_kernel_descriptors(&layout, &[rec], "/bin").unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&kernel_file).unwrap(), before);
    }

    #[test]
    fn test_generate_preserves_input_order() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = UserLayout::new(tmp.path(), "alice");
        let records: Vec<_> = ["b-conda", "a-conda"]
            .iter()
            .map(|n| EnvironmentRecord {
                name: n.to_string(),
                interpreter: PathBuf::from(format!("/envs/{}/bin/python", n)),
            })
            .collect();
        let paths = generate_kernel_descriptors(&layout, &records, "").unwrap();
        assert_eq!(
            paths,
            vec![layout.kernel_dir("b-conda"), layout.kernel_dir("a-conda")]
        );
    }
}
