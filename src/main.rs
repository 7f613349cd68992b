// ABOUTME: Entry point for the slipway CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use slipway::config::{self, Config};
use slipway::error::{Error, Result};
use slipway::output::Output;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut output = Output::new(cli.output_mode());
    output.start_timer();

    let loaded = match cli.command {
        Commands::Init { .. } => None,
        _ => Some(load_config(cli.config.as_deref())),
    };

    // `debug: true` in the selected environment raises verbosity like -v
    let debug = loaded
        .as_ref()
        .and_then(|r| r.as_ref().ok())
        .and_then(|c| c.for_environment(cli.command.environment()).ok())
        .and_then(|o| o.debug)
        .unwrap_or(false);

    let filter = if cli.verbose || debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Arc::new(output);
    let result = run(cli, loaded, output.clone()).await;

    if let Err(e) = result {
        output.error(&e.to_string());
        if let Error::Deploy(deploy_error) = &e
            && let Some(failure) = deploy_error.failure()
        {
            output.step_failure(failure);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

async fn run(cli: Cli, loaded: Option<Result<Config>>, output: Arc<Output>) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        let cwd = env::current_dir()?;
        config::init_config(&cwd, force)?;
        output.success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = loaded.ok_or(Error::MissingField("config"))??;
    let settings = config.settings(cli.command.environment())?;

    match cli.command {
        Commands::Deploy { label, .. } => commands::deploy(settings, label.as_deref(), output).await,
        Commands::Rollback { .. } => commands::rollback(settings, output).await,
        Commands::Status { .. } => commands::status(settings, output).await,
        Commands::Init { .. } => Ok(()),
    }
}
