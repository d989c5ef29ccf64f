//! Source verification through an Etherscan-compatible block explorer API

use alloy::{
    primitives::{hex, Address},
    transports::http::reqwest::Client,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    config::ExplorerConfig,
    constants::{
        ALREADY_VERIFIED_STATUS, KNOWN_EXPLORERS, STANDARD_JSON_CODE_FORMAT,
        VERIFY_PENDING_STATUS, VERIFY_STATUS_ATTEMPTS, VERIFY_STATUS_INTERVAL,
    },
    errors::ScriptError,
};

/// The API url of the explorer for the given chain, preferring an explicitly
/// configured one
pub fn resolve_api_url(explorer: &ExplorerConfig, chain_id: u64) -> Result<String, ScriptError> {
    if let Some(url) = &explorer.api_url {
        return Ok(url.clone());
    }

    KNOWN_EXPLORERS
        .iter()
        .find(|(id, _, _)| *id == chain_id)
        .map(|(_, api_url, _)| api_url.to_string())
        .ok_or_else(|| {
            ScriptError::Verification(format!(
                "no known explorer for chain id {chain_id}, set `etherscan.apiUrl`"
            ))
        })
}

/// A link to the address on the chain's block explorer, if the chain is known
pub fn explorer_address_url(chain_id: u64, address: Address) -> Option<String> {
    KNOWN_EXPLORERS
        .iter()
        .find(|(id, _, _)| *id == chain_id)
        .map(|(_, _, browser_url)| format!("{browser_url}/address/{address}"))
}

/// The parameters of a `verifysourcecode` submission
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    /// The deployed contract's address
    pub contract_address: Address,
    /// The fully qualified contract name, `<source>:<name>`
    pub contract_name: String,
    /// The full compiler version, without the leading `v`
    pub compiler_version: String,
    /// The standard-JSON compiler input, serialized
    pub source: String,
    /// The ABI-encoded constructor arguments
    pub constructor_args: Vec<u8>,
}

impl VerificationRequest {
    /// The form fields of the submission, minus the API key
    pub fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", format!("{:#x}", self.contract_address)),
            ("sourceCode", self.source.clone()),
            ("codeformat", STANDARD_JSON_CODE_FORMAT.to_string()),
            ("contractname", self.contract_name.clone()),
            ("compilerversion", format!("v{}", self.compiler_version)),
            // The misspelling is part of the explorer API
            ("constructorArguements", hex::encode(&self.constructor_args)),
        ]
    }
}

/// The envelope of every explorer API response
#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    /// `"1"` on success, `"0"` otherwise
    status: String,
    /// A short summary, e.g. `OK` or `NOTOK`
    #[serde(default)]
    message: String,
    /// The payload: a guid, a status string or an error description
    #[serde(default)]
    result: String,
}

/// The state of a submitted verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The explorer has not processed the submission yet
    Pending,
    /// The source is published
    Verified,
    /// The explorer rejected the submission
    Failed(String),
}

/// Interpret the response to a `checkverifystatus` query
fn interpret_status(resp: &ExplorerResponse) -> VerificationStatus {
    if resp.result == VERIFY_PENDING_STATUS {
        VerificationStatus::Pending
    } else if resp.status == "1" || resp.result.contains(ALREADY_VERIFIED_STATUS) {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Failed(format!("{}: {}", resp.message, resp.result))
    }
}

/// A client for an Etherscan-compatible explorer API
pub struct ExplorerClient {
    /// The HTTP client
    client: Client,
    /// The explorer's API endpoint
    api_url: String,
    /// The explorer API key
    api_key: String,
}

impl ExplorerClient {
    /// Create a client for the given endpoint
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }

    /// Submit the request and wait for the explorer to process it
    pub async fn verify(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        let Some(guid) = self.submit(request).await? else {
            info!("{} is already verified", request.contract_address);
            return Ok(());
        };
        debug!("verification submitted, guid {guid}");

        for _ in 0..VERIFY_STATUS_ATTEMPTS {
            tokio::time::sleep(VERIFY_STATUS_INTERVAL).await;
            match self.check_status(&guid).await? {
                VerificationStatus::Pending => continue,
                VerificationStatus::Verified => return Ok(()),
                VerificationStatus::Failed(reason) => {
                    return Err(ScriptError::Verification(reason));
                }
            }
        }

        Err(ScriptError::Verification(format!(
            "verification {guid} still pending after {VERIFY_STATUS_ATTEMPTS} checks"
        )))
    }

    /// Submit the source, returning the submission guid, or `None` if the
    /// contract is already verified
    async fn submit(&self, request: &VerificationRequest) -> Result<Option<String>, ScriptError> {
        let mut form = request.form();
        form.push(("apikey", self.api_key.clone()));

        let body = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .text()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;
        let resp = parse_response(&body)?;

        if resp.status == "1" {
            Ok(Some(resp.result))
        } else if resp.result.contains(ALREADY_VERIFIED_STATUS) {
            Ok(None)
        } else {
            Err(ScriptError::Verification(format!(
                "submission rejected: {}: {}",
                resp.message, resp.result
            )))
        }
    }

    /// Query the state of a previous submission
    async fn check_status(&self, guid: &str) -> Result<VerificationStatus, ScriptError> {
        let query = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ];
        let body = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?
            .text()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        Ok(interpret_status(&parse_response(&body)?))
    }
}

/// Parse the body of an explorer API response
fn parse_response(body: &str) -> Result<ExplorerResponse, ScriptError> {
    serde_json::from_str(body)
        .map_err(|e| ScriptError::Verification(format!("unexpected explorer response: {e}")))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn explorer(api_url: Option<&str>) -> ExplorerConfig {
        ExplorerConfig {
            api_key: "KEY".to_string(),
            api_url: api_url.map(str::to_string),
        }
    }

    #[test]
    fn test_known_chain_api_url() {
        assert_eq!(
            resolve_api_url(&explorer(None), 80001).unwrap(),
            "https://api-testnet.polygonscan.com/api"
        );
    }

    #[test]
    fn test_configured_api_url_wins() {
        let url = resolve_api_url(&explorer(Some("https://explorer.example/api")), 1).unwrap();
        assert_eq!(url, "https://explorer.example/api");
    }

    #[test]
    fn test_unknown_chain_api_url() {
        assert!(resolve_api_url(&explorer(None), 31337).is_err());
        assert!(explorer_address_url(31337, Address::ZERO).is_none());
    }

    #[test]
    fn test_explorer_address_url() {
        let addr = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
        assert_eq!(
            explorer_address_url(137, addr).unwrap(),
            format!("https://polygonscan.com/address/{addr}")
        );
    }

    #[test]
    fn test_request_form() {
        let request = VerificationRequest {
            contract_address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
            contract_name: "contracts/ParkPics.sol:ParkPics".to_string(),
            compiler_version: "0.8.2+commit.661d1103".to_string(),
            source: "{}".to_string(),
            constructor_args: vec![0xab, 0xcd],
        };
        let form = request.form();
        let field = |name: &str| {
            form.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(field("action"), "verifysourcecode");
        assert_eq!(field("contractaddress"), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
        assert_eq!(field("compilerversion"), "v0.8.2+commit.661d1103");
        assert_eq!(field("codeformat"), STANDARD_JSON_CODE_FORMAT);
        assert_eq!(field("constructorArguements"), "abcd");
        assert!(form.iter().all(|(k, _)| *k != "apikey"));
    }

    #[test]
    fn test_interpret_status() {
        let resp = |status: &str, result: &str| {
            parse_response(&format!(
                r#"{{ "status": "{status}", "message": "NOTOK", "result": "{result}" }}"#
            ))
            .unwrap()
        };

        assert_eq!(
            interpret_status(&resp("0", VERIFY_PENDING_STATUS)),
            VerificationStatus::Pending
        );
        assert_eq!(
            interpret_status(&resp("1", "Pass - Verified")),
            VerificationStatus::Verified
        );
        assert_eq!(
            interpret_status(&resp("0", "Already Verified")),
            VerificationStatus::Verified
        );
        assert!(matches!(
            interpret_status(&resp("0", "Fail - Unable to verify")),
            VerificationStatus::Failed(_)
        ));
    }
}
