//! The deployment configuration: compiler version, target networks and
//! explorer credentials, loaded once from a JSON file at startup

use std::{collections::BTreeMap, fs, path::Path};

use alloy::transports::http::reqwest::Url;
use serde::Deserialize;

use crate::{
    constants::{DEFAULT_COMPILER_VERSION, DEV_NETWORK_NAME, PLACEHOLDER_MARKER},
    errors::ScriptError,
};

/// The top-level configuration record
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// The compiler version the artifacts are expected to be built with
    #[serde(default)]
    pub solidity: SolidityConfig,
    /// The network used when none is selected explicitly
    #[serde(default = "default_network_name")]
    pub default_network: String,
    /// The configured networks, keyed by name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Block explorer credentials
    #[serde(default)]
    pub etherscan: Option<ExplorerConfig>,
}

/// The compiler section, either a bare version or a settings object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SolidityConfig {
    /// `"solidity": "0.8.2"`
    Version(String),
    /// `"solidity": { "version": "0.8.2" }`
    Settings {
        /// The compiler version
        version: String,
    },
}

impl Default for SolidityConfig {
    fn default() -> Self {
        SolidityConfig::Version(DEFAULT_COMPILER_VERSION.to_string())
    }
}

impl SolidityConfig {
    /// The configured compiler version
    pub fn version(&self) -> &str {
        match self {
            SolidityConfig::Version(v) | SolidityConfig::Settings { version: v } => v,
        }
    }
}

/// A single network entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// The RPC endpoint; absent for the ephemeral development network
    #[serde(default)]
    pub url: Option<String>,
    /// Hex-encoded private keys, the first of which deploys
    #[serde(default)]
    pub accounts: Vec<String>,
    /// The chain id the endpoint is expected to report
    #[serde(default)]
    pub chain_id: Option<u64>,
}

impl NetworkConfig {
    /// A printable form of the endpoint with the path and query stripped,
    /// since providers embed API keys there
    pub fn display_endpoint(&self) -> String {
        let Some(url) = &self.url else {
            return "<ephemeral>".to_string();
        };
        if is_placeholder(url) {
            return "<unconfigured>".to_string();
        }

        match Url::parse(url) {
            Ok(parsed) => match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{}://{host}:{port}", parsed.scheme()),
                (Some(host), None) => format!("{}://{host}", parsed.scheme()),
                _ => parsed.scheme().to_string(),
            },
            Err(_) => "<invalid>".to_string(),
        }
    }
}

/// Block explorer credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerConfig {
    /// The explorer API key
    pub api_key: String,
    /// An explicit API endpoint, for chains the tool does not know about
    #[serde(default)]
    pub api_url: Option<String>,
}

impl ExplorerConfig {
    /// The API key, rejecting unfilled template values
    pub fn api_key(&self) -> Result<&str, ScriptError> {
        if self.api_key.is_empty() || is_placeholder(&self.api_key) {
            return Err(ScriptError::Verification(
                "explorer API key is not configured".to_string(),
            ));
        }
        Ok(&self.api_key)
    }
}

/// Where the selected network's node lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A throwaway local node spawned for the lifetime of the process
    Ephemeral,
    /// A remote node reachable over HTTP
    Http(Url),
}

/// Which account signs the deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployerAccount {
    /// A private key held by this process
    Local(String),
    /// The node's first unlocked account
    Remote,
}

/// A network entry validated for use
#[derive(Debug, Clone)]
pub struct ResolvedNetwork {
    /// The network's name
    pub name: String,
    /// The node to talk to
    pub endpoint: Endpoint,
    /// The deploying account
    pub account: DeployerAccount,
    /// The chain id the endpoint must report, if pinned
    pub chain_id: Option<u64>,
}

impl DeployConfig {
    /// Read and parse the configuration file at the given path
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ScriptError::ConfigParsing(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse a configuration from its JSON representation
    pub fn from_json_str(contents: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(contents).map_err(|e| ScriptError::ConfigParsing(e.to_string()))
    }

    /// The name of the network that a run targets
    pub fn network_name<'a>(&'a self, selected: Option<&'a str>) -> &'a str {
        selected.unwrap_or(&self.default_network)
    }

    /// Look up and validate the selected network for operations that send no
    /// transactions; the configured accounts are neither checked nor used
    pub fn resolve_read_only(
        &self,
        selected: Option<&str>,
    ) -> Result<ResolvedNetwork, ScriptError> {
        let (name, network) = self.network_entry(selected)?;
        Ok(ResolvedNetwork {
            name: name.to_string(),
            endpoint: resolve_endpoint(name, &network)?,
            account: DeployerAccount::Remote,
            chain_id: network.chain_id,
        })
    }

    /// Look up and validate the selected network, falling back to the
    /// default network when none is given.
    ///
    /// A private key override replaces the network's configured accounts.
    pub fn resolve_network(
        &self,
        selected: Option<&str>,
        pkey_override: Option<&str>,
    ) -> Result<ResolvedNetwork, ScriptError> {
        let (name, network) = self.network_entry(selected)?;
        let endpoint = resolve_endpoint(name, &network)?;

        let account = match pkey_override {
            Some(pkey) => DeployerAccount::Local(pkey.to_string()),
            None => {
                if let Some(idx) = network.accounts.iter().position(|a| is_placeholder(a)) {
                    return Err(ScriptError::InvalidNetwork(format!(
                        "network `{name}` has a placeholder in accounts[{idx}]"
                    )));
                }
                network
                    .accounts
                    .first()
                    .map(|pkey| DeployerAccount::Local(pkey.clone()))
                    .unwrap_or(DeployerAccount::Remote)
            }
        };

        Ok(ResolvedNetwork {
            name: name.to_string(),
            endpoint,
            account,
            chain_id: network.chain_id,
        })
    }

    /// The entry of the selected network, synthesizing one for the built-in
    /// development network if the configuration does not declare it
    fn network_entry<'a>(
        &'a self,
        selected: Option<&'a str>,
    ) -> Result<(&'a str, NetworkConfig), ScriptError> {
        let name = self.network_name(selected);
        match self.networks.get(name) {
            Some(network) => Ok((name, network.clone())),
            None if name == DEV_NETWORK_NAME => Ok((name, NetworkConfig::default())),
            None => {
                let known = self.networks.keys().cloned().collect::<Vec<_>>().join(", ");
                Err(ScriptError::InvalidNetwork(format!(
                    "network `{name}` is not configured (known networks: {known})"
                )))
            }
        }
    }
}

/// Validate a network's endpoint
fn resolve_endpoint(name: &str, network: &NetworkConfig) -> Result<Endpoint, ScriptError> {
    match &network.url {
        None => Ok(Endpoint::Ephemeral),
        Some(url) if is_placeholder(url) => Err(ScriptError::InvalidNetwork(format!(
            "network `{name}` has a placeholder url"
        ))),
        Some(url) => Url::parse(url).map(Endpoint::Http).map_err(|e| {
            ScriptError::InvalidNetwork(format!("network `{name}` has an invalid url: {e}"))
        }),
    }
}

/// Whether the given value is an unfilled template value
pub fn is_placeholder(value: &str) -> bool {
    value.contains(PLACEHOLDER_MARKER)
}

/// The default value of `defaultNetwork`
fn default_network_name() -> String {
    DEV_NETWORK_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The configuration template shipped with the project
    const TEMPLATE_CONFIG: &str = r#"{
        "solidity": "0.8.2",
        "defaultNetwork": "hardhat",
        "networks": {
            "hardhat": {},
            "mumbai": {
                "url": "https://rpc-mumbai.maticvigil.com",
                "accounts": ["<ADD WALLET PRIVATE KEY>"]
            },
            "polygon": {
                "url": "https://polygon-mainnet.infura.io/v3/<ADD API KEY>",
                "accounts": ["<ADD WALLET PRIVATE KEY>"]
            },
            "ethereum": {
                "url": "https://mainnet.infura.io/v3/0123456789abcdef",
                "accounts": ["0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"],
                "chainId": 1
            }
        },
        "etherscan": {
            "apiKey": "<ADD API KEY>"
        }
    }"#;

    fn template() -> DeployConfig {
        DeployConfig::from_json_str(TEMPLATE_CONFIG).unwrap()
    }

    #[test]
    fn test_parse_template() {
        let config = template();
        assert_eq!(config.solidity.version(), "0.8.2");
        assert_eq!(config.default_network, "hardhat");
        assert_eq!(config.networks.len(), 4);
        assert_eq!(config.networks["ethereum"].chain_id, Some(1));
    }

    #[test]
    fn test_solidity_settings_object() {
        let config =
            DeployConfig::from_json_str(r#"{ "solidity": { "version": "0.8.19" } }"#).unwrap();
        assert_eq!(config.solidity.version(), "0.8.19");
        assert_eq!(config.default_network, DEV_NETWORK_NAME);
    }

    #[test]
    fn test_malformed_config() {
        let res = DeployConfig::from_json_str(r#"{ "networks": [] }"#);
        assert!(matches!(res, Err(ScriptError::ConfigParsing(_))));
    }

    #[test]
    fn test_default_network_is_ephemeral() {
        let network = template().resolve_network(None, None).unwrap();
        assert_eq!(network.name, "hardhat");
        assert_eq!(network.endpoint, Endpoint::Ephemeral);
        assert_eq!(network.account, DeployerAccount::Remote);
    }

    #[test]
    fn test_builtin_dev_network_without_entry() {
        let config = DeployConfig::from_json_str("{}").unwrap();
        let network = config.resolve_network(Some("hardhat"), None).unwrap();
        assert_eq!(network.endpoint, Endpoint::Ephemeral);
    }

    #[test]
    fn test_placeholder_account_rejected() {
        let err = template().resolve_network(Some("mumbai"), None).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidNetwork(ref s) if s.contains("accounts[0]")));
    }

    #[test]
    fn test_placeholder_url_rejected() {
        let err = template()
            .resolve_network(Some("polygon"), Some("0x01"))
            .unwrap_err();
        assert!(matches!(err, ScriptError::InvalidNetwork(ref s) if s.contains("url")));
    }

    #[test]
    fn test_pkey_override_replaces_accounts() {
        let network = template()
            .resolve_network(Some("mumbai"), Some("0x01"))
            .unwrap();
        assert_eq!(network.account, DeployerAccount::Local("0x01".to_string()));
        assert_eq!(
            network.endpoint,
            Endpoint::Http(Url::parse("https://rpc-mumbai.maticvigil.com").unwrap())
        );
    }

    #[test]
    fn test_configured_network() {
        let network = template().resolve_network(Some("ethereum"), None).unwrap();
        assert_eq!(network.chain_id, Some(1));
        assert!(matches!(network.account, DeployerAccount::Local(_)));
    }

    #[test]
    fn test_read_only_ignores_accounts() {
        let network = template().resolve_read_only(Some("mumbai")).unwrap();
        assert_eq!(network.account, DeployerAccount::Remote);
        assert!(template().resolve_read_only(Some("polygon")).is_err());
    }

    #[test]
    fn test_unknown_network() {
        let err = template().resolve_network(Some("goerli"), None).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidNetwork(ref s) if s.contains("goerli")));
    }

    #[test]
    fn test_display_endpoint_redacts_path() {
        let config = template();
        assert_eq!(
            config.networks["ethereum"].display_endpoint(),
            "https://mainnet.infura.io"
        );
        assert_eq!(config.networks["polygon"].display_endpoint(), "<unconfigured>");
        assert_eq!(config.networks["hardhat"].display_endpoint(), "<ephemeral>");

        let local = NetworkConfig {
            url: Some("http://127.0.0.1:8545".to_string()),
            ..Default::default()
        };
        assert_eq!(local.display_endpoint(), "http://127.0.0.1:8545");
    }

    #[test]
    fn test_placeholder_api_key() {
        let config = template();
        let explorer = config.etherscan.unwrap();
        assert!(explorer.api_key().is_err());
    }
}
