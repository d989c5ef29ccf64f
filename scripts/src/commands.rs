//! Implementations of the various deploy scripts

use std::str::FromStr;

use alloy::{
    primitives::{hex, Address},
    providers::{Provider, ProviderBuilder},
};
use tracing::{debug, info, warn};

use crate::{
    artifacts::ContractArtifact,
    cli::{DeployArgs, VerifyArgs},
    config::{DeployConfig, Endpoint},
    constants::DEV_NETWORK_NAME,
    errors::ScriptError,
    factory::{ContractFactory, Deployment},
    utils::{read_deployed_address, setup_client, write_deployed_address},
    verify::{explorer_address_url, resolve_api_url, ExplorerClient, VerificationRequest},
};

/// Deploy the artifact named in `args`, wait for confirmation and print the
/// resulting address
pub async fn deploy(
    args: DeployArgs,
    config: &DeployConfig,
    network: Option<&str>,
    priv_key: Option<&str>,
) -> Result<Deployment, ScriptError> {
    // Everything that can be checked offline is checked before connecting
    let network = config.resolve_network(network, priv_key)?;
    let artifact = ContractArtifact::find(&args.artifacts, &args.contract)?;
    warn_on_compiler_mismatch(config, &artifact);
    let constructor_args = parse_hex_arg(args.constructor_args.as_deref())?;

    let client = setup_client(&network).await?;
    let factory = ContractFactory::new(artifact, client.provider.clone(), client.deployer);

    let pending = factory.deploy(&constructor_args).await?;
    let deployment = pending.deployed(args.confirmations).await?;

    println!(
        "{} deployed to: {}",
        deployment.contract_name, deployment.address
    );
    info!(
        "creation transaction {} included in block {}",
        deployment.tx_hash,
        deployment
            .block_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    );
    if let Some(url) = explorer_address_url(client.chain_id, deployment.address) {
        info!("view on explorer: {url}");
    }

    if let Some(deployments_path) = &args.deployments {
        write_deployed_address(
            deployments_path,
            &network.name,
            &deployment.contract_name,
            deployment.address,
        )?;
        debug!("recorded deployment in {}", deployments_path.display());
    }

    if network.endpoint == Endpoint::Ephemeral {
        warn!(
            "`{}` is an ephemeral network, the deployment is discarded on exit",
            network.name
        );
    }

    Ok(deployment)
}

/// Print the configured networks, marking the one a run would target
pub fn list_networks(config: &DeployConfig, selected: Option<&str>) {
    let target = config.network_name(selected);
    if !config.networks.contains_key(DEV_NETWORK_NAME) {
        let marker = if target == DEV_NETWORK_NAME { "*" } else { " " };
        println!("{marker} {DEV_NETWORK_NAME:<12} <ephemeral> (built-in)");
    }

    for (name, network) in &config.networks {
        let marker = if name == target { "*" } else { " " };
        println!(
            "{marker} {name:<12} {} ({} account(s))",
            network.display_endpoint(),
            network.accounts.len()
        );
    }
}

/// Publish the source of a deployed contract on the network's block explorer
pub async fn verify(
    args: VerifyArgs,
    config: &DeployConfig,
    network: Option<&str>,
) -> Result<(), ScriptError> {
    let network = config.resolve_read_only(network)?;
    let Endpoint::Http(url) = &network.endpoint else {
        return Err(ScriptError::Verification(format!(
            "`{}` is an ephemeral network and has no explorer",
            network.name
        )));
    };

    let explorer = config.etherscan.as_ref().ok_or_else(|| {
        ScriptError::Verification("no `etherscan` section in the configuration".to_string())
    })?;
    let api_key = explorer.api_key()?;

    let artifact = ContractArtifact::find(&args.artifacts, &args.contract)?;
    let contract_name = artifact.fully_qualified_name().ok_or_else(|| {
        ScriptError::Verification(format!(
            "artifact {} does not record its source file",
            artifact.path.display()
        ))
    })?;
    let build_info = artifact.build_info()?.ok_or_else(|| {
        ScriptError::Verification(format!(
            "no build info found for `{}`",
            artifact.contract_name
        ))
    })?;
    if build_info.solc_version != config.solidity.version() {
        return Err(ScriptError::Verification(format!(
            "`{}` was compiled with solc {}, but the configuration expects {}",
            artifact.contract_name,
            build_info.solc_version,
            config.solidity.version()
        )));
    }

    let contract_address = match (&args.address, &args.deployments) {
        (Some(address), _) => parse_address_arg(address)?,
        (None, Some(deployments_path)) => {
            read_deployed_address(deployments_path, &network.name, &artifact.contract_name)?
        }
        (None, None) => {
            return Err(ScriptError::Verification(
                "either --address or --deployments is required".to_string(),
            ));
        }
    };

    let chain_id = match network.chain_id {
        Some(chain_id) => chain_id,
        None => ProviderBuilder::new()
            .connect_http(url.clone())
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?,
    };
    let api_url = resolve_api_url(explorer, chain_id)?;

    let source = serde_json::to_string(&build_info.input)
        .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    let request = VerificationRequest {
        contract_address,
        contract_name,
        compiler_version: build_info.solc_long_version,
        source,
        constructor_args: parse_hex_arg(args.constructor_args.as_deref())?,
    };

    info!("submitting {} to {api_url}", request.contract_name);
    ExplorerClient::new(api_url, api_key.to_string())
        .verify(&request)
        .await?;

    println!(
        "Successfully verified {} at {}",
        request.contract_name, contract_address
    );
    if let Some(url) = explorer_address_url(chain_id, contract_address) {
        info!("view on explorer: {url}#code");
    }

    Ok(())
}

/// Warn if the artifact was built by a compiler other than the configured one
fn warn_on_compiler_mismatch(config: &DeployConfig, artifact: &ContractArtifact) {
    match artifact.build_info() {
        Ok(Some(build_info)) if build_info.solc_version != config.solidity.version() => {
            warn!(
                "`{}` was compiled with solc {}, but the configuration expects {}",
                artifact.contract_name,
                build_info.solc_version,
                config.solidity.version()
            );
        }
        Ok(_) => {}
        Err(e) => debug!("could not read build info: {e}"),
    }
}

/// Decode an optional hex argument, treating its absence as empty
fn parse_hex_arg(arg: Option<&str>) -> Result<Vec<u8>, ScriptError> {
    match arg {
        Some(s) => hex::decode(s).map_err(|e| ScriptError::CalldataConstruction(e.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Parse the `--address` argument of the verify command
fn parse_address_arg(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address)
        .map_err(|e| ScriptError::Verification(format!("invalid address `{address}`: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::{parse_address_arg, parse_hex_arg};
    use crate::errors::ScriptError;

    #[test]
    fn test_parse_hex_arg() {
        assert!(parse_hex_arg(None).unwrap().is_empty());
        assert_eq!(parse_hex_arg(Some("0x00ff")).unwrap(), vec![0x00, 0xff]);
        assert_eq!(parse_hex_arg(Some("00ff")).unwrap(), vec![0x00, 0xff]);
        assert!(parse_hex_arg(Some("0xzz")).is_err());
    }

    #[test]
    fn test_parse_address_arg() {
        assert_eq!(
            parse_address_arg("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap(),
            address!("5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert!(matches!(parse_address_arg("0x1234"), Err(ScriptError::Verification(_))));
    }
}
