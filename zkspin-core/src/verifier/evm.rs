//! EVM verifier contract submitter.

use async_trait::async_trait;
use ethers::{
    prelude::*,
    types::{Address, Bytes, U256},
};
use std::sync::Arc;
use tracing::{debug, info};

use super::VerifierSubmitter;
use crate::error::SpinError;

/// Solidity signature of the generated verifier entry point.
const VERIFY_PROOF_SIGNATURE: &str = "verifyProof(bytes,uint256[])";

/// Submits proofs to an on-chain verifier and waits for confirmations.
pub struct EvmVerifier {
    client: Arc<SignerMiddleware<Provider<Http>, LocalWallet>>,
    verifier_address: Address,
    confirmations: usize,
}

impl EvmVerifier {
    /// Connect to `rpc_url` and sign with `private_key`.
    pub async fn connect(
        rpc_url: &str,
        verifier_address: &str,
        private_key: &str,
        confirmations: usize,
    ) -> Result<Self, SpinError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| SpinError::Verifier(format!("failed to create HTTP provider: {}", e)))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| SpinError::Verifier(format!("failed to fetch chain id: {}", e)))?;

        let wallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| SpinError::Verifier(format!("invalid private key: {}", e)))?
            .with_chain_id(chain_id.as_u64());

        let verifier_address: Address = verifier_address
            .parse()
            .map_err(|e| SpinError::Verifier(format!("invalid verifier address: {}", e)))?;

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            verifier_address,
            confirmations,
        })
    }
}

/// ABI-encode a `verifyProof(bytes,uint256[])` call.
fn encode_verify_call(proof: &[u8], instances: &[String]) -> Result<Vec<u8>, SpinError> {
    let instances = instances
        .iter()
        .map(|instance| parse_instance(instance).map(ethers::abi::Token::Uint))
        .collect::<Result<Vec<_>, _>>()?;

    let selector = &ethers::utils::keccak256(VERIFY_PROOF_SIGNATURE)[..4];
    let arguments = ethers::abi::encode(&[
        ethers::abi::Token::Bytes(proof.to_vec()),
        ethers::abi::Token::Array(instances),
    ]);

    let mut calldata = selector.to_vec();
    calldata.extend_from_slice(&arguments);
    Ok(calldata)
}

fn parse_instance(instance: &str) -> Result<U256, SpinError> {
    let trimmed = instance.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => U256::from_dec_str(trimmed).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| SpinError::MalformedNumeral(format!("{:?}: {}", instance, e)))
}

#[async_trait]
impl VerifierSubmitter for EvmVerifier {
    fn name(&self) -> &str {
        "evm"
    }

    async fn submit(&self, proof: &[u8], instances: &[String]) -> Result<String, SpinError> {
        let calldata = encode_verify_call(proof, instances)?;

        let tx = TransactionRequest::new()
            .to(self.verifier_address)
            .data(Bytes::from(calldata));

        debug!("Sending verifyProof to {:?}", self.verifier_address);

        let pending_tx = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| SpinError::Verifier(e.to_string()))?;

        info!("Verifier transaction submitted: {:?}", pending_tx.tx_hash());

        let receipt = pending_tx
            .confirmations(self.confirmations)
            .await
            .map_err(|e| SpinError::Verifier(e.to_string()))?
            .ok_or_else(|| SpinError::Verifier("transaction dropped".into()))?;

        if receipt.status != Some(1u64.into()) {
            return Err(SpinError::Verifier(format!(
                "transaction {:?} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calldata_layout() {
        let calldata = encode_verify_call(&[0xab, 0xcd], &["1".into(), "0x10".into()]).unwrap();
        let selector = &ethers::utils::keccak256(VERIFY_PROOF_SIGNATURE)[..4];
        assert_eq!(&calldata[..4], selector);
        // head (2 offsets) + bytes (len + 1 word) + array (len + 2 words)
        assert_eq!(calldata.len(), 4 + 32 * 7);
        assert_eq!(calldata[4 + 32 * 6 - 1], 1);
        assert_eq!(calldata[4 + 32 * 7 - 1], 0x10);
    }

    #[test]
    fn test_rejects_bad_instance() {
        assert!(encode_verify_call(&[], &["not a number".into()]).is_err());
    }
}
