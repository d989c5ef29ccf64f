//! Utilities for the deploy scripts.

use std::{fs, path::Path, str::FromStr};

use alloy::{
    node_bindings::{Anvil, AnvilInstance},
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    config::{DeployerAccount, Endpoint, ResolvedNetwork},
    constants::DEPLOYMENTS_KEY,
    errors::ScriptError,
};

/// An RPC client connected to the selected network
pub struct DeployClient {
    /// The provider, with the deployer's signer attached when it is held locally
    pub provider: DynProvider,
    /// The chain id reported by the node
    pub chain_id: u64,
    /// The account that sends the deployment
    pub deployer: Address,
    /// The development node backing an ephemeral network, killed on drop
    _node: Option<AnvilInstance>,
}

/// Sets up the client with which to deploy to the given network,
/// spawning a development node if the network is ephemeral
pub async fn setup_client(network: &ResolvedNetwork) -> Result<DeployClient, ScriptError> {
    let (url, node) = match &network.endpoint {
        Endpoint::Http(url) => (url.clone(), None),
        Endpoint::Ephemeral => {
            let node = Anvil::new().try_spawn().map_err(|e| {
                ScriptError::ClientInitialization(format!(
                    "could not spawn development node: {e}"
                ))
            })?;
            debug!("spawned development node at {}", node.endpoint());
            (node.endpoint_url(), Some(node))
        }
    };

    let (provider, local_deployer) = match &network.account {
        DeployerAccount::Local(pkey) => {
            let signer = PrivateKeySigner::from_str(pkey)
                .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
            let address = signer.address();
            let provider = ProviderBuilder::new().wallet(signer).connect_http(url);
            (DynProvider::new(provider), Some(address))
        }
        DeployerAccount::Remote => {
            let provider = ProviderBuilder::new().connect_http(url);
            (DynProvider::new(provider), None)
        }
    };

    let chain_id = provider
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    if let Some(expected) = network.chain_id {
        if expected != chain_id {
            return Err(ScriptError::InvalidNetwork(format!(
                "network `{}` expects chain id {expected}, endpoint reports {chain_id}",
                network.name
            )));
        }
    }

    let deployer = match local_deployer {
        Some(address) => address,
        None => provider
            .get_accounts()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
            .first()
            .copied()
            .ok_or_else(|| {
                ScriptError::ClientInitialization("node has no unlocked accounts".to_string())
            })?,
    };

    info!(
        "connected to `{}` (chain id {chain_id}) as {deployer}",
        network.name
    );

    Ok(DeployClient {
        provider,
        chain_id,
        deployer,
        _node: node,
    })
}

/// Read a JSON object from the deployments file, or an empty one if the file
/// does not exist yet
fn read_deployments(file_path: &Path) -> Result<Value, ScriptError> {
    if !file_path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents =
        fs::read_to_string(file_path).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    let parsed: Value = serde_json::from_str(&contents)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    if !parsed.is_object() {
        return Err(ScriptError::WriteDeployments(format!(
            "{} does not contain a JSON object",
            file_path.display()
        )));
    }

    Ok(parsed)
}

/// Get the object stored under `key`, inserting an empty one if absent
fn object_entry<'a>(
    obj: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, ScriptError> {
    obj.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| ScriptError::WriteDeployments(format!("`{key}` is not a JSON object")))
}

/// Record a deployed address under `deployments.<network>.<contract>`,
/// preserving every other entry in the file
pub fn write_deployed_address(
    file_path: &Path,
    network: &str,
    contract: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut parsed_json = read_deployments(file_path)?;

    // `read_deployments` only ever returns objects
    if let Some(root) = parsed_json.as_object_mut() {
        let deployments = object_entry(root, DEPLOYMENTS_KEY)?;
        let network_deployments = object_entry(deployments, network)?;
        network_deployments.insert(contract.to_string(), Value::String(format!("{address:#x}")));
    }

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

    Ok(())
}

/// Read a deployed address back from the deployments file
pub fn read_deployed_address(
    file_path: &Path,
    network: &str,
    contract: &str,
) -> Result<Address, ScriptError> {
    let contents = fs::read_to_string(file_path).map_err(|e| {
        ScriptError::ReadDeployments(format!("could not read {}: {}", file_path.display(), e))
    })?;
    let parsed_json: Value =
        serde_json::from_str(&contents).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;

    let address = parsed_json[DEPLOYMENTS_KEY][network][contract]
        .as_str()
        .ok_or_else(|| {
            ScriptError::ReadDeployments(format!(
                "no deployment of `{contract}` on `{network}` in {}",
                file_path.display()
            ))
        })?;

    Address::from_str(address).map_err(|e| ScriptError::ReadDeployments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.json");
        let addr = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

        write_deployed_address(&path, "localhost", "ParkPics", addr).unwrap();
        assert_eq!(read_deployed_address(&path, "localhost", "ParkPics").unwrap(), addr);
    }

    #[test]
    fn test_write_preserves_other_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.json");
        fs::write(
            &path,
            r#"{ "deployments": { "mumbai": { "Marketplace": "0x0000000000000000000000000000000000000001" } }, "note": "kept" }"#,
        )
        .unwrap();

        let addr = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
        write_deployed_address(&path, "mumbai", "ParkPics", addr).unwrap();

        let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["note"], "kept");
        assert_eq!(
            json["deployments"]["mumbai"]["Marketplace"],
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(read_deployed_address(&path, "mumbai", "ParkPics").unwrap(), addr);
    }

    #[test]
    fn test_write_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.json");
        fs::write(&path, r#"{ "deployments": [] }"#).unwrap();

        let res = write_deployed_address(&path, "mumbai", "ParkPics", Address::ZERO);
        assert!(matches!(res, Err(ScriptError::WriteDeployments(_))));
    }

    #[test]
    fn test_read_missing_deployment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.json");
        write_deployed_address(&path, "mumbai", "ParkPics", Address::ZERO).unwrap();

        let res = read_deployed_address(&path, "polygon", "ParkPics");
        assert!(matches!(res, Err(ScriptError::ReadDeployments(_))));
    }
}
