use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use clap::Parser;
use scripts::{cli::Cli, config::DeployConfig, errors::ScriptError};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration and run the selected script
async fn run(cli: Cli) -> Result<(), ScriptError> {
    let Cli {
        config,
        network,
        priv_key,
        command,
    } = cli;

    let config = DeployConfig::load(&config)?;
    command
        .run(&config, network.as_deref(), priv_key.as_deref())
        .await
}
