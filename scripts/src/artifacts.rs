//! Lookup and parsing of compiled contract artifacts
//!
//! Both the Hardhat layout (`artifacts/contracts/<File>.sol/<Name>.json`, with
//! a `<Name>.dbg.json` pointing at the build info) and the Foundry layout
//! (`out/<File>.sol/<Name>.json`) are understood.

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy::primitives::{hex, Bytes};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, BUILD_INFO_DIR, DEBUG_FILE_SUFFIX, LIBRARY_PLACEHOLDER_MARKER,
    },
    errors::ScriptError,
};

/// A compiled contract, ready to be handed to a contract factory
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The contract's name
    pub contract_name: String,
    /// The source file the contract was compiled from, if recorded
    pub source_name: Option<String>,
    /// The contract's ABI
    pub abi: Value,
    /// The creation bytecode
    pub bytecode: Bytes,
    /// The file the artifact was read from
    pub path: PathBuf,
}

/// The artifact file as written by the compiler toolchain
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// The contract's name, absent in Foundry artifacts
    #[serde(default)]
    contract_name: Option<String>,
    /// The source file, absent in Foundry artifacts
    #[serde(default)]
    source_name: Option<String>,
    /// The contract's ABI
    #[serde(default)]
    abi: Value,
    /// The creation bytecode
    bytecode: RawBytecode,
}

/// Hardhat stores the bytecode as a string, Foundry wraps it in an object
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    /// `"bytecode": "0x..."`
    Hex(String),
    /// `"bytecode": { "object": "0x..." }`
    Object {
        /// The hex-encoded bytecode
        object: String,
    },
}

/// The debug file written next to each Hardhat artifact
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    /// The build info path, relative to the debug file
    build_info: String,
}

/// The compiler invocation that produced an artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// The short compiler version, e.g. `0.8.2`
    pub solc_version: String,
    /// The full compiler version, e.g. `0.8.2+commit.661d1103`
    pub solc_long_version: String,
    /// The standard-JSON compiler input
    pub input: Value,
}

impl ContractArtifact {
    /// Find the artifact for the given contract under `artifacts_dir`.
    ///
    /// `contract` is either a bare name (`ParkPics`) or a fully qualified name
    /// (`contracts/ParkPics.sol:ParkPics`).
    pub fn find(artifacts_dir: &Path, contract: &str) -> Result<Self, ScriptError> {
        let (source, name) = match contract.rsplit_once(':') {
            Some((source, name)) => (Some(source), name),
            None => (None, contract),
        };

        let mut candidates = Vec::new();
        collect_candidates(artifacts_dir, name, &mut candidates)?;
        if let Some(source) = source {
            // Foundry drops the source directories, so fall back to the file
            // name when no artifact sits under the full source path
            if candidates.iter().any(|path| under_source_path(path, source)) {
                candidates.retain(|path| under_source_path(path, source));
            } else {
                candidates.retain(|path| under_source_file(path, source));
            }
        }

        match candidates.len() {
            0 => Err(ScriptError::ReadArtifact(format!(
                "no artifact for `{contract}` under {}",
                artifacts_dir.display()
            ))),
            1 => Self::from_file(&candidates[0], name),
            _ => {
                let paths = candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ScriptError::ReadArtifact(format!(
                    "multiple artifacts for `{contract}`, use a fully qualified name: {paths}"
                )))
            }
        }
    }

    /// Read the artifact at `path`, naming the contract `default_name` if the
    /// file does not record a name itself
    pub fn from_file(path: &Path, default_name: &str) -> Result<Self, ScriptError> {
        debug!("reading artifact {}", path.display());
        let contents =
            fs::read_to_string(path).map_err(|e| ScriptError::ReadArtifact(e.to_string()))?;
        let raw: RawArtifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let contract_name = raw.contract_name.unwrap_or_else(|| default_name.to_string());
        let bytecode_hex = match raw.bytecode {
            RawBytecode::Hex(s) | RawBytecode::Object { object: s } => s,
        };
        let bytecode = parse_creation_code(&contract_name, &bytecode_hex)?;

        Ok(Self {
            contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            bytecode,
            path: path.to_path_buf(),
        })
    }

    /// The `<source>:<name>` form of the contract's name
    pub fn fully_qualified_name(&self) -> Option<String> {
        self.source_name
            .as_ref()
            .map(|source| format!("{source}:{}", self.contract_name))
    }

    /// Load the build info referenced by the artifact's debug file.
    ///
    /// Returns `None` for layouts that do not record one.
    pub fn build_info(&self) -> Result<Option<BuildInfo>, ScriptError> {
        let dbg_path = self.path.with_file_name(format!(
            "{}{}",
            self.contract_name, DEBUG_FILE_SUFFIX
        ));
        if !dbg_path.exists() {
            return Ok(None);
        }

        let dbg_contents =
            fs::read_to_string(&dbg_path).map_err(|e| ScriptError::ReadArtifact(e.to_string()))?;
        let dbg: DebugFile = serde_json::from_str(&dbg_contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        // The build info path is relative to the debug file
        let build_info_path = dbg_path
            .parent()
            .map(|dir| dir.join(&dbg.build_info))
            .unwrap_or_else(|| PathBuf::from(&dbg.build_info));
        let contents = fs::read_to_string(&build_info_path).map_err(|e| {
            ScriptError::ReadArtifact(format!("{}: {}", build_info_path.display(), e))
        })?;
        let build_info = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        Ok(Some(build_info))
    }
}

/// Decode creation bytecode, rejecting code that cannot be deployed as-is
fn parse_creation_code(contract_name: &str, bytecode_hex: &str) -> Result<Bytes, ScriptError> {
    if bytecode_hex.contains(LIBRARY_PLACEHOLDER_MARKER) {
        return Err(ScriptError::UndeployableArtifact(format!(
            "`{contract_name}` references unlinked libraries"
        )));
    }

    let bytecode = hex::decode(bytecode_hex)
        .map_err(|e| ScriptError::ArtifactParsing(format!("invalid bytecode: {e}")))?;
    if bytecode.is_empty() {
        return Err(ScriptError::UndeployableArtifact(format!(
            "`{contract_name}` has no bytecode, it is abstract or an interface"
        )));
    }

    Ok(bytecode.into())
}

/// Recursively collect the artifact files named `<name>.json` under `dir`
fn collect_candidates(dir: &Path, name: &str, out: &mut Vec<PathBuf>) -> Result<(), ScriptError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ScriptError::ReadArtifact(format!("{}: {}", dir.display(), e)))?;

    for entry in entries {
        let path = entry.map_err(|e| ScriptError::ReadArtifact(e.to_string()))?.path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            collect_candidates(&path, name, out)?;
            continue;
        }

        let is_debug_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(DEBUG_FILE_SUFFIX));
        let is_match = path.extension().is_some_and(|ext| ext == ARTIFACT_EXTENSION)
            && path.file_stem().is_some_and(|stem| stem == name);
        if is_match && !is_debug_file {
            out.push(path);
        }
    }

    Ok(())
}

/// Whether the artifact at `path` lives under the full source path,
/// e.g. `artifacts/contracts/ParkPics.sol/ParkPics.json`
fn under_source_path(path: &Path, source: &str) -> bool {
    path.parent()
        .is_some_and(|parent| parent.ends_with(Path::new(source)))
}

/// Whether the artifact at `path` lives under a directory named after the
/// source file, e.g. `out/ParkPics.sol/ParkPics.json`
fn under_source_file(path: &Path, source: &str) -> bool {
    let source_file = Path::new(source).file_name();
    source_file.is_some()
        && path
            .parent()
            .is_some_and(|parent| parent.file_name() == source_file)
}
