//! Constants used in the deploy scripts

use std::time::Duration;

/// The default path of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "deploy.config.json";

/// The default directory in which compilation artifacts are found
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The name of the built-in development network, always available even
/// when absent from the configuration file
pub const DEV_NETWORK_NAME: &str = "hardhat";

/// The default compiler version, used when the configuration omits one
pub const DEFAULT_COMPILER_VERSION: &str = "0.8.2";

/// Marker found in template values that were never filled in,
/// e.g. `<ADD WALLET PRIVATE KEY>`
pub const PLACEHOLDER_MARKER: &str = "<ADD";

/// The number of confirmations to wait for the contract deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: u64 = 1;

/// The directory, inside the artifacts directory, holding compiler build info
pub const BUILD_INFO_DIR: &str = "build-info";

/// The suffix of the debug files that accompany each Hardhat artifact
pub const DEBUG_FILE_SUFFIX: &str = ".dbg.json";

/// The extension of artifact files
pub const ARTIFACT_EXTENSION: &str = "json";

/// The marker that begins an unlinked library placeholder in creation bytecode
pub const LIBRARY_PLACEHOLDER_MARKER: &str = "__$";

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The number of times to poll the explorer for the verification status
pub const VERIFY_STATUS_ATTEMPTS: usize = 10;

/// The delay between verification status polls
pub const VERIFY_STATUS_INTERVAL: Duration = Duration::from_secs(3);

/// The `codeformat` value for standard-JSON verification requests
pub const STANDARD_JSON_CODE_FORMAT: &str = "solidity-standard-json-input";

/// Explorer status message for a submission that has not been processed yet
pub const VERIFY_PENDING_STATUS: &str = "Pending in queue";

/// Explorer message for a contract whose source is already published
pub const ALREADY_VERIFIED_STATUS: &str = "Already Verified";

/// Block explorers for the chains the tool knows about, as
/// `(chain id, API url, browser url)`
pub const KNOWN_EXPLORERS: [(u64, &str, &str); 4] = [
    (1, "https://api.etherscan.io/api", "https://etherscan.io"),
    (4, "https://api-rinkeby.etherscan.io/api", "https://rinkeby.etherscan.io"),
    (137, "https://api.polygonscan.com/api", "https://polygonscan.com"),
    (80001, "https://api-testnet.polygonscan.com/api", "https://mumbai.polygonscan.com"),
];
