// ABOUTME: Entry point for the dropship CLI application.
// ABOUTME: Parses arguments, sets up tracing, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use dropship::config::{self, Config};
use dropship::error::Result;
use dropship::output::{Output, OutputMode};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve, false) => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(OutputMode::from_flags(cli.quiet, cli.json));
    let mode = output.mode();

    if let Err(e) = run(cli, output).await {
        // Outcome failures were already printed by the command
        if !matches!(e, dropship::error::Error::Failed { .. }) {
            Output::new(mode).error(&e.to_string());
        }
        std::process::exit(1);
    }
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config> {
    match explicit {
        Some(path) => Config::load(path),
        None => Config::discover_upwards(cwd),
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Init {
            base_update_path,
            force,
        } => {
            config::init_config(&cwd, base_update_path.as_deref(), force)?;
            output.success("Created dropship.yml");
            Ok(())
        }
        Commands::Serve => commands::serve(load_config(explicit, &cwd)?, output).await,
        Commands::Push { package } => {
            commands::push(load_config(explicit, &cwd)?, &package, output).await
        }
        Commands::Fullupdate { force } => {
            commands::fullupdate(load_config(explicit, &cwd)?, &cwd, force, output).await
        }
        Commands::Migrate {
            connection_string,
            scripts_dir,
        } => {
            // The migrate command works without a config unless one was named
            let config = match explicit {
                Some(path) => Some(Config::load(path)?),
                None => Config::discover_upwards(&cwd).ok(),
            };
            let scripts_dir = match (scripts_dir, &config) {
                (Some(dir), _) => dir,
                (None, Some(config)) => config.scripts_dir(&cwd),
                (None, None) => cwd.join("Database"),
            };
            commands::migrate(config, &scripts_dir, &connection_string, output).await
        }
        Commands::UpdateFolder {
            folder,
            connection_string,
            force,
        } => {
            let config = load_config(explicit, &cwd)?;
            commands::update_folder(config, &cwd, &folder, &connection_string, force, output)
                .await
        }
    }
}
