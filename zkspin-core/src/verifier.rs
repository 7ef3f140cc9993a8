//! Hand-off of completed proofs to a verifier.
//!
//! The controller awaits [`VerifierSubmitter::submit`]; its completion is the
//! signal that the rotation may be animated.

use async_trait::async_trait;
use tracing::info;

use crate::error::SpinError;

#[cfg(feature = "evm")]
mod evm;

#[cfg(feature = "evm")]
pub use evm::EvmVerifier;

/// Receives a proof and its public instances.
#[async_trait]
pub trait VerifierSubmitter: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Submit the proof. Returns a receipt identifier (e.g. a transaction hash).
    async fn submit(&self, proof: &[u8], instances: &[String]) -> Result<String, SpinError>;
}

#[async_trait]
impl<T: VerifierSubmitter + ?Sized> VerifierSubmitter for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn submit(&self, proof: &[u8], instances: &[String]) -> Result<String, SpinError> {
        (**self).submit(proof, instances).await
    }
}

/// Verifier that only records the hand-off in the log.
#[derive(Clone, Debug, Default)]
pub struct LoggingVerifier;

#[async_trait]
impl VerifierSubmitter for LoggingVerifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn submit(&self, proof: &[u8], instances: &[String]) -> Result<String, SpinError> {
        let digest = hex::encode(&proof[..proof.len().min(8)]);
        info!(
            proof_bytes = proof.len(),
            instances = instances.len(),
            "proof handed to logging verifier"
        );
        Ok(format!("log:{}", digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_verifier_receipt() {
        let verifier = LoggingVerifier;
        let receipt = verifier
            .submit(&[0xaa; 32], &["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert_eq!(receipt, "log:aaaaaaaaaaaaaaaa");
        assert_eq!(verifier.name(), "log");
    }

    #[tokio::test]
    async fn test_logging_verifier_short_proof() {
        let receipt = LoggingVerifier.submit(&[0x01], &[]).await.unwrap();
        assert_eq!(receipt, "log:01");
    }
}
