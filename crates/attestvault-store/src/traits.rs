//! Store trait: the abstract interface for ledger state.
//!
//! Every method that mutates more than one piece of state does so atomically:
//! either all of its effects are visible or none are. The ledger relies on
//! this and never composes writes out of several store calls.
//!
//! Mutating methods take an optional [`TransactionKey`]. When present, the key
//! is spent in the same atomic step as the write, whatever the write's
//! outcome. A key that is already spent fails the call with
//! [`StoreError::TransactionReplayed`](crate::StoreError::TransactionReplayed)
//! and nothing changes.

use async_trait::async_trait;
use attestvault_core::{
    Aggregate, ArtifactHash, AttestationRecord, ClaimKey, CredentialRecord, GrantKey, KeyId,
    Principal, Quality, TransactionKey,
};

use crate::consumption::{ConsumeOutcome, IssueOutcome, SlotState};
use crate::error::Result;

/// Result of committing a new attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// Claim consumed, record stored, aggregate bumped.
    Committed {
        /// The aggregate after the increment.
        aggregate: Aggregate,
    },
    /// The claim was already consumed. Nothing changed.
    ClaimConsumed,
}

/// Result of removing an attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveResult {
    /// Record removed and aggregate decremented.
    Removed {
        record: AttestationRecord,
        aggregate: Aggregate,
    },
    /// No live record for this owner and artifact.
    NotFound,
    /// The live record's quality differs from the expected one. Nothing changed.
    QualityMismatch { live: Quality },
}

/// Result of releasing a vault entry to a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseResult {
    /// Grant consumed (if one was required) and the earliest entry returned.
    Released(CredentialRecord),
    /// Grant consumed (if one was required) but the vault has no such entry.
    NoEntry,
    /// The grant was already used. Nothing changed.
    GrantConsumed,
    /// The grant was never issued. Nothing changed.
    GrantNotIssued,
}

/// The Store trait: async interface for ledger persistence.
///
/// # Design Notes
///
/// - **Claims are permanent**: once consumed, a claim key stays consumed,
///   including after the attestation it guarded is removed.
/// - **Ordered vaults**: credential records keep their insertion position.
///   "First" always means earliest position; replacing a record keeps it.
/// - **Clamped aggregates**: decrements saturate at zero.
/// - **Grants never reset**: registering a consumed grant leaves it consumed.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Attestation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Consume `claim`, append `record` to its owner's set and fold its
    /// quality into the artifact's aggregate, as one transaction.
    async fn commit_attestation(
        &self,
        record: &AttestationRecord,
        claim: &ClaimKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<CommitResult>;

    /// Remove the owner's live record for `artifact` and decrement the
    /// aggregate, as one transaction.
    ///
    /// With `expected_quality` set, the removal only happens if the live
    /// record has exactly that quality.
    async fn remove_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        expected_quality: Option<Quality>,
        transaction: Option<&TransactionKey>,
    ) -> Result<RemoveResult>;

    /// The owner's live record for an artifact, if any.
    async fn find_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
    ) -> Result<Option<AttestationRecord>>;

    /// All of an owner's live attestations, oldest first.
    async fn attestations_for(&self, owner: &Principal) -> Result<Vec<AttestationRecord>>;

    /// Public totals for an artifact. Zero if never attested.
    async fn aggregate(&self, artifact: &ArtifactHash) -> Result<Aggregate>;

    /// Whether a claim key has been consumed.
    async fn is_claimed(&self, claim: &ClaimKey) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Credential Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record at the end of its owner's vault.
    async fn append_credential(
        &self,
        record: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<()>;

    /// The earliest record for `key_id` in the owner's vault.
    async fn first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
    ) -> Result<Option<CredentialRecord>>;

    /// All of an owner's records in position order.
    async fn credentials_for(&self, owner: &Principal) -> Result<Vec<CredentialRecord>>;

    /// Remove the earliest record for `key_id`, returning it.
    async fn remove_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>>;

    /// Replace the earliest record for `key_id` with `replacement` at the same
    /// position, returning the record it replaced.
    ///
    /// The vault is never observed without one of the two.
    async fn replace_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        replacement: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a delegation grant.
    async fn register_grant(
        &self,
        key: &GrantKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<IssueOutcome>;

    /// Consume a grant. Exactly one caller ever sees `Consumed`.
    async fn consume_grant(&self, key: &GrantKey) -> Result<ConsumeOutcome>;

    /// Consume `grant` (when given) and read the owner's earliest entry for
    /// `key_id`, as one transaction.
    ///
    /// Without a grant the read is the owner's own and nothing is consumed.
    /// The grant stays consumed even if the entry is missing.
    async fn release_credential(
        &self,
        grant: Option<&GrantKey>,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<ReleaseResult>;

    /// State of a grant, `None` if never registered.
    async fn grant_state(&self, key: &GrantKey) -> Result<Option<SlotState>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Spend a transaction key with no other write.
    async fn spend_transaction(&self, transaction: &TransactionKey) -> Result<()>;

    /// Whether a transaction key has been spent.
    async fn is_transaction_spent(&self, transaction: &TransactionKey) -> Result<bool>;
}
