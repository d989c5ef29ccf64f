//! Definitions of CLI arguments and commands for deploy scripts

use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use crate::{
    commands::{deploy, list_networks, verify},
    config::DeployConfig,
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_CONFIG_PATH, NUM_DEPLOY_CONFIRMATIONS},
    errors::ScriptError,
};

/// The contract deployed when none is named
const DEFAULT_CONTRACT: &str = "ParkPics";

/// Deploy and verify the ParkPics contracts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the deployment configuration
    #[arg(short, long, env = "DEPLOY_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// The network to target, defaults to the configuration's `defaultNetwork`
    #[arg(short, long, env = "DEPLOY_NETWORK")]
    pub network: Option<String>,

    /// Private key of the deployer, replacing the network's configured accounts
    #[arg(long = "pkey", env = "PKEY", hide_env_values = true)]
    pub priv_key: Option<String>,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The available scripts
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract and print its address
    Deploy(DeployArgs),
    /// List the configured networks
    Networks,
    /// Publish a deployed contract's source on the block explorer
    Verify(VerifyArgs),
}

impl Command {
    /// Run the command against the selected network
    pub async fn run(
        self,
        config: &DeployConfig,
        network: Option<&str>,
        priv_key: Option<&str>,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, config, network, priv_key).await.map(|_| ()),
            Command::Networks => {
                list_networks(config, network);
                Ok(())
            }
            Command::Verify(args) => verify(args, config, network).await,
        }
    }
}

/// Deploy a contract from its compilation artifact
#[derive(Args, Clone)]
pub struct DeployArgs {
    /// The contract to deploy, by name or as `<source>:<name>`
    #[arg(short, long, default_value = DEFAULT_CONTRACT)]
    pub contract: String,

    /// The directory containing the compilation artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// ABI-encoded constructor arguments, in hex
    #[arg(long)]
    pub constructor_args: Option<String>,

    /// The number of confirmations to wait for
    #[arg(long, default_value_t = NUM_DEPLOY_CONFIRMATIONS, value_parser = value_parser!(u64).range(1..))]
    pub confirmations: u64,

    /// A JSON file in which to record the deployed address
    #[arg(short, long)]
    pub deployments: Option<PathBuf>,
}

/// Verify a deployed contract
#[derive(Args, Clone)]
pub struct VerifyArgs {
    /// The contract to verify, by name or as `<source>:<name>`
    #[arg(short, long, default_value = DEFAULT_CONTRACT)]
    pub contract: String,

    /// The deployed address, in hex; read from the deployments file if omitted
    #[arg(long)]
    pub address: Option<String>,

    /// The directory containing the compilation artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// ABI-encoded constructor arguments the contract was deployed with, in hex
    #[arg(long)]
    pub constructor_args: Option<String>,

    /// The JSON file the deployed address was recorded in
    #[arg(short, long)]
    pub deployments: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn test_deploy_defaults() {
        let cli = Cli::try_parse_from(["parkpics-deploy", "deploy"]).unwrap();
        let Command::Deploy(args) = cli.command else {
            panic!("expected the deploy command");
        };

        assert_eq!(args.contract, "ParkPics");
        assert_eq!(args.confirmations, 1);
        assert!(args.deployments.is_none());
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        let res = Cli::try_parse_from(["parkpics-deploy", "deploy", "--confirmations", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_global_network_flag() {
        let cli =
            Cli::try_parse_from(["parkpics-deploy", "--network", "mumbai", "networks"]).unwrap();
        assert_eq!(cli.network.as_deref(), Some("mumbai"));
        assert!(matches!(cli.command, Command::Networks));
    }
}
