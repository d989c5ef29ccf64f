//! A contract factory: submits the creation transaction for an artifact and
//! waits for the network to confirm it

use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{PendingTransactionBuilder, Provider},
    rpc::types::TransactionRequest,
};
use tracing::{debug, info};

use crate::{artifacts::ContractArtifact, errors::ScriptError};

/// Deploys instances of a single compiled contract
pub struct ContractFactory<P> {
    /// The contract to deploy
    artifact: ContractArtifact,
    /// The provider through which the deployment is sent
    provider: P,
    /// The account sending the deployment
    deployer: Address,
}

/// A deployment that has been submitted but not yet confirmed
pub struct PendingDeployment {
    /// The name of the contract being deployed
    contract_name: String,
    /// The in-flight creation transaction
    pending_tx: PendingTransactionBuilder<Ethereum>,
}

/// A confirmed deployment
#[derive(Debug, Clone)]
pub struct Deployment {
    /// The name of the deployed contract
    pub contract_name: String,
    /// The address at which the contract lives
    pub address: Address,
    /// The hash of the creation transaction
    pub tx_hash: TxHash,
    /// The block in which the creation transaction was included
    pub block_number: Option<u64>,
}

impl<P: Provider> ContractFactory<P> {
    /// Create a factory for the given artifact
    pub fn new(artifact: ContractArtifact, provider: P, deployer: Address) -> Self {
        Self {
            artifact,
            provider,
            deployer,
        }
    }

    /// The artifact this factory deploys
    pub fn artifact(&self) -> &ContractArtifact {
        &self.artifact
    }

    /// Submit the creation transaction.
    ///
    /// `constructor_args` must already be ABI-encoded; they are appended to the
    /// creation bytecode.
    pub async fn deploy(&self, constructor_args: &[u8]) -> Result<PendingDeployment, ScriptError> {
        let code = creation_code(&self.artifact.bytecode, constructor_args);
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(code);

        let pending_tx = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;
        debug!(
            "submitted `{}` creation transaction {}",
            self.artifact.contract_name,
            pending_tx.tx_hash()
        );

        Ok(PendingDeployment {
            contract_name: self.artifact.contract_name.clone(),
            pending_tx,
        })
    }
}

impl PendingDeployment {
    /// The hash of the creation transaction
    pub fn tx_hash(&self) -> TxHash {
        *self.pending_tx.tx_hash()
    }

    /// Block until the creation transaction has the given number of
    /// confirmations, returning the deployed contract's address
    pub async fn deployed(self, confirmations: u64) -> Result<Deployment, ScriptError> {
        let tx_hash = self.tx_hash();
        info!("waiting for {confirmations} confirmation(s) of {tx_hash}");

        let receipt = self
            .pending_tx
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "creation transaction {tx_hash} reverted"
            )));
        }
        let address = receipt.contract_address().ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "receipt for {tx_hash} has no contract address"
            ))
        })?;

        Ok(Deployment {
            contract_name: self.contract_name,
            address,
            tx_hash,
            block_number: receipt.block_number(),
        })
    }
}

/// The creation bytecode followed by the encoded constructor arguments
fn creation_code(bytecode: &Bytes, constructor_args: &[u8]) -> Bytes {
    let mut code = Vec::with_capacity(bytecode.len() + constructor_args.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(constructor_args);
    code.into()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::bytes;

    use super::creation_code;

    #[test]
    fn test_creation_code_without_args() {
        let bytecode = bytes!("600a600c600039600a6000f3");
        assert_eq!(creation_code(&bytecode, &[]), bytecode);
    }

    #[test]
    fn test_creation_code_appends_args() {
        let bytecode = bytes!("6080");
        let args = [0u8; 32];
        let code = creation_code(&bytecode, &args);

        assert_eq!(code.len(), 34);
        assert_eq!(&code[..2], &bytecode[..]);
        assert!(code[2..].iter().all(|b| *b == 0));
    }
}
