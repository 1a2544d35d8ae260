//! Certificates: signed authorizations for ledger transitions.
//!
//! A [`Transaction`] bundles an [`Operation`], the [`PublicEffect`] it claims
//! to have on the public aggregate, and a [`Certificate`] binding both to the
//! acting principal and a per-transaction nonce. The ledger checks the
//! signature and recomputes the effect before applying anything, and spends
//! the transaction's [`TransactionKey`] so it commits at most once.

use serde::{Deserialize, Serialize};

use crate::canonical::signed_message;
use crate::crypto::{Ed25519Signature, Keypair, Principal};
use crate::error::CoreError;
use crate::types::{ArtifactHash, KeyId, TransactionKey};

/// A state transition requested by the certificate's signer.
///
/// The signer is the acting party: the attester, the vault owner, the grantor
/// or the delegated reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Attest {
        artifact: ArtifactHash,
        quality: u64,
        methodology: u8,
    },
    Revoke {
        artifact: ArtifactHash,
    },
    StoreCredential {
        key_id: KeyId,
        value: String,
        label: String,
    },
    DeleteCredential {
        key_id: KeyId,
    },
    RotateCredential {
        key_id: KeyId,
        value: String,
        label: String,
    },
    Grant {
        grantee: Principal,
        key_id: KeyId,
        nonce: u64,
    },
    ReadViaDelegation {
        owner: Principal,
        key_id: KeyId,
        nonce: u64,
    },
}

impl Operation {
    /// Stable discriminant used in the canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Attest { .. } => 1,
            Self::Revoke { .. } => 2,
            Self::StoreCredential { .. } => 3,
            Self::DeleteCredential { .. } => 4,
            Self::RotateCredential { .. } => 5,
            Self::Grant { .. } => 6,
            Self::ReadViaDelegation { .. } => 7,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Attest { .. } => "attest",
            Self::Revoke { .. } => "revoke",
            Self::StoreCredential { .. } => "store",
            Self::DeleteCredential { .. } => "delete",
            Self::RotateCredential { .. } => "rotate",
            Self::Grant { .. } => "grant",
            Self::ReadViaDelegation { .. } => "read_via_delegation",
        }
    }

    /// Whether this operation ever touches the public aggregate.
    pub fn has_public_effect(&self) -> bool {
        matches!(self, Self::Attest { .. } | Self::Revoke { .. })
    }
}

/// The change an operation makes to the public aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicEffect {
    None,
    Increment { artifact: ArtifactHash, quality: u64 },
    Decrement { artifact: ArtifactHash, quality: u64 },
}

impl PublicEffect {
    pub fn tag(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Increment { .. } => 1,
            Self::Decrement { .. } => 2,
        }
    }
}

/// Signature by the acting principal over an operation and its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub signer: Principal,
    pub signature: Ed25519Signature,
}

/// A certified request ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Distinguishes otherwise identical transactions by the same signer.
    pub nonce: u64,
    pub operation: Operation,
    pub effect: PublicEffect,
    pub certificate: Certificate,
}

impl Transaction {
    /// Sign an operation and its declared effect under a fresh random nonce.
    pub fn sign(
        keypair: &Keypair,
        operation: Operation,
        effect: PublicEffect,
    ) -> Result<Self, CoreError> {
        Self::sign_with_nonce(keypair, rand::random(), operation, effect)
    }

    /// Sign under a caller-chosen nonce.
    ///
    /// A signer must never reuse a nonce: the second transaction would be
    /// rejected as already committed.
    pub fn sign_with_nonce(
        keypair: &Keypair,
        nonce: u64,
        operation: Operation,
        effect: PublicEffect,
    ) -> Result<Self, CoreError> {
        let signer = keypair.public_key();
        let message = signed_message(&signer, nonce, &operation, &effect)?;
        let signature = keypair.sign(&message);

        Ok(Self {
            nonce,
            operation,
            effect,
            certificate: Certificate { signer, signature },
        })
    }

    /// The acting principal.
    pub fn signer(&self) -> &Principal {
        &self.certificate.signer
    }

    /// The key this transaction spends when committed.
    pub fn key(&self) -> TransactionKey {
        TransactionKey::derive(&self.certificate.signer, self.nonce)
    }

    /// Check the signature over the operation and declared effect.
    ///
    /// This does not check that the effect is the one the operation actually
    /// has; that needs ledger state.
    pub fn verify_signature(&self) -> Result<(), CoreError> {
        let message = signed_message(
            &self.certificate.signer,
            self.nonce,
            &self.operation,
            &self.effect,
        )?;
        self.certificate
            .signer
            .verify(&message, &self.certificate.signature)
    }
}
