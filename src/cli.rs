// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments, and the global output flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dropship")]
#[command(about = "Unattended release delivery: push, install, migrate, deploy")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of discovering one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a dropship.yml template in the current directory
    Init {
        /// Directory that receives extracted releases
        #[arg(long)]
        base_update_path: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Listen for packages and install each one as it arrives
    Serve,

    /// Push a release zip to the configured daemon
    Push {
        /// Path to the release .zip
        package: PathBuf,
    },

    /// Deploy the release containing the current directory
    Fullupdate {
        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Bring a database up to the newest script version
    Migrate {
        #[arg(long)]
        connection_string: String,

        /// Directory of .sql scripts (defaults to the configured one)
        #[arg(long)]
        scripts_dir: Option<PathBuf>,
    },

    /// Deploy a single folder of the release containing the current directory
    UpdateFolder {
        /// Folder name from AppInfo.json
        folder: String,

        #[arg(long)]
        connection_string: String,

        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },
}
