//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading or parsing the configuration file
    ConfigParsing(String),
    /// The selected network is missing or incompletely configured
    InvalidNetwork(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error reading a compilation artifact from disk
    ReadArtifact(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// The artifact exists but cannot be deployed as-is
    UndeployableArtifact(String),
    /// Error constructing calldata for the deployment
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error querying the chain
    ContractInteraction(String),
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// Error verifying a contract with the block explorer
    Verification(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ConfigParsing(s) => write!(f, "error parsing config: {}", s),
            ScriptError::InvalidNetwork(s) => write!(f, "invalid network: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ReadArtifact(s) => write!(f, "error reading artifact: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::UndeployableArtifact(s) => write!(f, "cannot deploy artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with chain: {}", s)
            }
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
        }
    }
}

impl Error for ScriptError {}
