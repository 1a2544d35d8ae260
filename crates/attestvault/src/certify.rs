//! Certificate generation.
//!
//! A certificate service sees the caller's private records and produces a
//! signed [`Transaction`] declaring the operation's public effect. It runs
//! before, and independently of, the ledger's commit: a certificate that is
//! never committed has no effect, and two certificates for the same claim may
//! both be produced while only one can commit.

use async_trait::async_trait;

use attestvault_core::{AttestationRecord, Keypair, Operation, Principal, PublicEffect, Transaction};

use crate::error::{LedgerError, Result};

/// The public effect an operation has, given the caller's live attestations.
///
/// Attest adds its quality. Revoke subtracts the quality of the live record it
/// removes, so it needs the private view. Everything else is invisible
/// publicly.
pub fn expected_effect(
    operation: &Operation,
    private_records: &[AttestationRecord],
) -> Result<PublicEffect> {
    Ok(match operation {
        Operation::Attest {
            artifact, quality, ..
        } => PublicEffect::Increment {
            artifact: *artifact,
            quality: *quality,
        },
        Operation::Revoke { artifact } => {
            let record = private_records
                .iter()
                .find(|r| &r.artifact == artifact)
                .ok_or_else(|| LedgerError::no_attestation(artifact))?;
            PublicEffect::Decrement {
                artifact: *artifact,
                quality: record.quality.value(),
            }
        }
        _ => PublicEffect::None,
    })
}

/// Produces certified transactions.
#[async_trait]
pub trait CertificateService: Send + Sync {
    /// The principal whose certificates this service issues.
    fn principal(&self) -> Principal;

    /// Certify `operation` given the caller's live attestations.
    async fn certify(
        &self,
        operation: Operation,
        private_records: &[AttestationRecord],
    ) -> Result<Transaction>;
}

/// Signs transactions locally with an Ed25519 keypair.
pub struct KeypairCertifier {
    keypair: Keypair,
}

impl KeypairCertifier {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl CertificateService for KeypairCertifier {
    fn principal(&self) -> Principal {
        self.keypair.public_key()
    }

    async fn certify(
        &self,
        operation: Operation,
        private_records: &[AttestationRecord],
    ) -> Result<Transaction> {
        let effect = expected_effect(&operation, private_records)?;
        tracing::debug!(op = operation.name(), signer = %self.principal(), "certifying");
        Ok(Transaction::sign(&self.keypair, operation, effect)?)
    }
}
