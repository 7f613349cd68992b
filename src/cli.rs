// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use slipway::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slipway")]
#[command(about = "Symlink-switched release deployment over SSH")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging, including remote commands and their output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of discovering slipway.yml
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new slipway.yml configuration file
    Init {
        /// Overwrite an existing slipway.yml
        #[arg(long)]
        force: bool,
    },

    /// Upload a new release and make it live
    Deploy {
        /// Environment to deploy to (defined in config)
        environment: Option<String>,

        /// Release label instead of the configured or timestamp label
        #[arg(long)]
        label: Option<String>,
    },

    /// Point the live symlink back at the previous release
    Rollback {
        /// Environment to roll back (defined in config)
        environment: Option<String>,
    },

    /// Show the live release and all releases on the target
    Status {
        /// Environment to inspect (defined in config)
        environment: Option<String>,
    },
}

impl Commands {
    pub fn environment(&self) -> Option<&str> {
        match self {
            Commands::Init { .. } => None,
            Commands::Deploy { environment, .. }
            | Commands::Rollback { environment }
            | Commands::Status { environment } => environment.as_deref(),
        }
    }
}
