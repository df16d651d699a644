mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use condaspawn_core::observability;

fn main() -> Result<()> {
    observability::init_tracing();
    let cli = Cli::parse();
    let config = commands::load_config(cli.home_root);

    match cli.command {
        Commands::Discover { user, json } => commands::discover::cmd_discover(config, &user, json),
        Commands::Provision {
            user,
            group,
            state_file,
            skip_failures,
            no_chown,
        } => commands::provision::cmd_provision(
            config,
            &user,
            group.as_deref(),
            state_file.as_deref(),
            skip_failures,
            no_chown,
        ),
        Commands::Teardown { state_file, user } => {
            commands::teardown::cmd_teardown(config, &state_file, user.as_deref())
        }
        Commands::KernelJson {
            name,
            python,
            inherited_path,
        } => commands::kernel_json::cmd_kernel_json(&config, &name, python, inherited_path.as_deref()),
        Commands::Config => commands::config::cmd_config(&config),
    }
}
