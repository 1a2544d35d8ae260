//! Certificate verification.

use attestvault_core::Transaction;

use crate::error::{LedgerError, Result};

/// Checks that a transaction's certificate authorizes its operation and
/// declared effect.
///
/// This only covers the certificate itself. Whether the declared effect is
/// the one the operation really has is checked by the ledger against its own
/// state.
pub trait CertificateVerifier: Send + Sync {
    fn verify(&self, transaction: &Transaction) -> Result<()>;
}

/// Accepts a certificate if its Ed25519 signature covers the operation and
/// effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl CertificateVerifier for SignatureVerifier {
    fn verify(&self, transaction: &Transaction) -> Result<()> {
        transaction
            .verify_signature()
            .map_err(|e| LedgerError::InvalidCertificate(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestvault_core::{ArtifactHash, Keypair, Operation, PublicEffect};

    #[test]
    fn test_signature_verifier() {
        let keypair = Keypair::generate();
        let op = Operation::Revoke {
            artifact: ArtifactHash::ZERO,
        };
        let effect = PublicEffect::Decrement {
            artifact: ArtifactHash::ZERO,
            quality: 10,
        };
        let mut tx = Transaction::sign(&keypair, op, effect).unwrap();
        assert!(SignatureVerifier.verify(&tx).is_ok());

        tx.effect = PublicEffect::None;
        assert!(matches!(
            SignatureVerifier.verify(&tx),
            Err(LedgerError::InvalidCertificate(_))
        ));
    }
}
