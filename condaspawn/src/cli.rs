use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// condaspawn - conda kernels and parallel profiles for notebook users
#[derive(Parser, Debug)]
#[command(name = "condaspawn")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Parent directory of user homes (default: CONDASPAWN_HOME_ROOT or /home)
    #[arg(long, global = true, value_name = "DIR")]
    pub home_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the user's notebook-capable conda environments
    Discover {
        /// System user name
        #[arg(long)]
        user: String,

        /// Print JSON instead of one environment per line
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Generate kernel descriptors and parallel profiles for a user
    Provision {
        /// System user name
        #[arg(long)]
        user: String,

        /// Group for the ownership fix (default: same as user)
        #[arg(long)]
        group: Option<String>,

        /// Write the resulting spawner state here (JSON)
        #[arg(long, value_name = "FILE")]
        state_file: Option<PathBuf>,

        /// Drop environments whose profile cannot be scaffolded instead of failing
        #[arg(long, default_value = "false")]
        skip_failures: bool,

        /// Do not chown ~/.ipython to the user
        #[arg(long, default_value = "false")]
        no_chown: bool,
    },

    /// Delete the directories recorded in a state file
    Teardown {
        /// State file written by `provision`
        #[arg(long, value_name = "FILE")]
        state_file: PathBuf,

        /// Only delete paths belonging to this user (default: owner taken from each path)
        #[arg(long)]
        user: Option<String>,
    },

    /// Print the kernel.json document for one interpreter
    KernelJson {
        /// Display name, e.g. `myenv-conda`
        #[arg(long)]
        name: String,

        /// Interpreter path, e.g. `/home/alice/.conda/envs/myenv/bin/python`
        #[arg(long, value_name = "PATH")]
        python: PathBuf,

        /// PATH appended after the interpreter's directory (default: current PATH)
        #[arg(long, value_name = "PATH")]
        inherited_path: Option<String>,
    },

    /// Print the effective configuration as JSON
    Config,
}
