//! Error types for the Ledger.

use attestvault_core::{ArtifactHash, CoreError, KeyId, ValidationError};
use attestvault_perms::PermsError;
use attestvault_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Ledger operations.
///
/// Every error is returned before any state changes, with two exceptions: a
/// delegated read that finds no record still consumes its grant, and a
/// certified transaction that reaches the store is spent whatever its outcome.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input validation error (quality or methodology).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The owner already attested this artifact. Claims are never released.
    #[error("claim already consumed for artifact {0}")]
    ClaimConsumed(ArtifactHash),

    /// The delegation grant was already used.
    #[error("delegation grant already consumed")]
    GrantConsumed,

    /// No grant exists for the exact (grantee, owner, key, nonce) tuple.
    #[error("no delegation grant for this request")]
    NoSuchGrant,

    /// No live attestation or vault entry matched.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The certificate failed verification, its declared effect is wrong, or
    /// the transaction was already committed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The value does not fit a vault entry and truncation is disabled.
    #[error("value of {len} bytes exceeds vault capacity of {capacity} bytes")]
    ValueTooLarge { len: usize, capacity: usize },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sealing error.
    #[error("permission error: {0}")]
    Perms(#[from] PermsError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl LedgerError {
    pub(crate) fn no_attestation(artifact: &ArtifactHash) -> Self {
        Self::RecordNotFound(format!("attestation for artifact {}", artifact))
    }

    pub(crate) fn no_credential(key_id: &KeyId) -> Self {
        Self::RecordNotFound(format!("credential {:?}", key_id))
    }
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
