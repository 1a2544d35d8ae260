//! The Ledger: the one context object for attestations, the credential vault
//! and delegation.
//!
//! Every write is a single atomic store operation. The ledger validates input,
//! derives the claim or grant key and hands the whole transition to the store,
//! so a failed call never leaves partial state behind. Certified commits also
//! hand over the transaction's key, which the store spends in the same step.

use std::sync::Arc;

use attestvault_core::{
    Aggregate, ArtifactHash, AttestationRecord, ClaimKey, CoreError, CredentialRecord, KeyId,
    Methodology, Operation, Principal, PublicEffect, Quality, RecordId, Transaction,
    TransactionKey, TrustLevel, VaultValue, VAULT_CAPACITY,
};
use attestvault_perms::{DelegationGrant, SealedValue, X25519PublicKey};
use attestvault_store::{
    CommitResult, IssueOutcome, ReleaseResult, RemoveResult, SlotState, Store, StoreError,
};

use crate::certify::CertificateService;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::verify::{CertificateVerifier, SignatureVerifier};

/// What a committed transaction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// New attestation record.
    Attested(RecordId),
    /// Removed attestation record.
    Revoked(RecordId),
    /// New vault record.
    Stored(RecordId),
    /// Removed vault record.
    Deleted(RecordId),
    /// Replacement vault record.
    Rotated(RecordId),
    /// Registered grant nonce.
    Granted(u64),
    /// Value released by a delegated read.
    Read(String),
}

/// The main Ledger struct.
///
/// Provides:
/// - Attestations and public per-artifact aggregates
/// - An ordered credential vault per owner
/// - Single-use delegated reads of vault entries
/// - Certified commits of any of the above
///
/// Each ledger owns its state through its store; ledgers over different
/// stores are fully isolated.
pub struct Ledger<S: Store> {
    store: Arc<S>,
    config: LedgerConfig,
    verifier: Arc<dyn CertificateVerifier>,
}

impl<S: Store> Ledger<S> {
    /// Create a ledger over `store`.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a ledger over a store that is also held elsewhere.
    pub fn with_shared_store(store: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            verifier: Arc::new(SignatureVerifier),
        }
    }

    /// Replace the certificate verifier used by [`commit`](Self::commit).
    pub fn with_verifier(mut self, verifier: impl CertificateVerifier + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attestation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record `owner`'s quality signal for `artifact`.
    ///
    /// Each owner can attest an artifact once, ever. The claim stays consumed
    /// after revocation.
    pub async fn attest(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        quality: u64,
        methodology: Methodology,
    ) -> Result<RecordId> {
        self.attest_with(owner, artifact, quality, methodology, None)
            .await
    }

    async fn attest_with(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        quality: u64,
        methodology: Methodology,
        transaction: Option<&TransactionKey>,
    ) -> Result<RecordId> {
        let quality = Quality::new(quality)?;
        let record = AttestationRecord::new(*owner, *artifact, quality, methodology);
        let claim = ClaimKey::derive(owner, artifact);

        match self
            .store
            .commit_attestation(&record, &claim, transaction)
            .await?
        {
            CommitResult::Committed { aggregate } => {
                tracing::debug!(
                    owner = %owner,
                    artifact = %artifact,
                    score = aggregate.score,
                    count = aggregate.count,
                    "attestation recorded"
                );
                Ok(record.id)
            }
            CommitResult::ClaimConsumed => {
                tracing::warn!(owner = %owner, artifact = %artifact, "claim already consumed");
                Err(LedgerError::ClaimConsumed(*artifact))
            }
        }
    }

    /// Remove `owner`'s live attestation for `artifact`.
    pub async fn revoke(&self, owner: &Principal, artifact: &ArtifactHash) -> Result<RecordId> {
        self.revoke_with(owner, artifact, None, None).await
    }

    async fn revoke_with(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        expected_quality: Option<Quality>,
        transaction: Option<&TransactionKey>,
    ) -> Result<RecordId> {
        match self
            .store
            .remove_attestation(owner, artifact, expected_quality, transaction)
            .await?
        {
            RemoveResult::Removed { record, aggregate } => {
                tracing::debug!(
                    owner = %owner,
                    artifact = %artifact,
                    score = aggregate.score,
                    count = aggregate.count,
                    "attestation revoked"
                );
                Ok(record.id)
            }
            RemoveResult::NotFound => Err(LedgerError::no_attestation(artifact)),
            RemoveResult::QualityMismatch { live } => Err(LedgerError::InvalidCertificate(
                format!("live attestation has quality {}", live.value()),
            )),
        }
    }

    /// Sum of quality over live attestations. Zero for unknown artifacts.
    pub async fn get_score(&self, artifact: &ArtifactHash) -> Result<u64> {
        Ok(self.store.aggregate(artifact).await?.score)
    }

    /// Number of live attestations. Zero for unknown artifacts.
    pub async fn get_count(&self, artifact: &ArtifactHash) -> Result<u64> {
        Ok(self.store.aggregate(artifact).await?.count)
    }

    /// Score and count from one consistent read.
    pub async fn aggregate(&self, artifact: &ArtifactHash) -> Result<Aggregate> {
        Ok(self.store.aggregate(artifact).await?)
    }

    /// Public trust label for an artifact.
    pub async fn trust_level(&self, artifact: &ArtifactHash) -> Result<TrustLevel> {
        Ok(self.aggregate(artifact).await?.trust_level())
    }

    /// The owner's live attestations, oldest first.
    pub async fn attestations(&self, owner: &Principal) -> Result<Vec<AttestationRecord>> {
        Ok(self.store.attestations_for(owner).await?)
    }

    /// Whether `owner` has ever attested `artifact`.
    pub async fn is_claimed(&self, owner: &Principal, artifact: &ArtifactHash) -> Result<bool> {
        Ok(self
            .store
            .is_claimed(&ClaimKey::derive(owner, artifact))
            .await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Vault Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a value to the owner's vault. Existing entries for `key_id` are
    /// kept; reads resolve to the earliest.
    pub async fn store_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        value: &str,
        label: &str,
    ) -> Result<RecordId> {
        self.store_with(owner, key_id, value, label, None).await
    }

    async fn store_with(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        value: &str,
        label: &str,
        transaction: Option<&TransactionKey>,
    ) -> Result<RecordId> {
        let record = CredentialRecord::new(*owner, *key_id, self.encode_value(value)?, label);
        self.store.append_credential(&record, transaction).await?;

        tracing::debug!(owner = %owner, key_id = %key_id, "credential stored");
        Ok(record.id)
    }

    /// The value of the earliest entry for `key_id`.
    pub async fn get_credential(&self, owner: &Principal, key_id: &KeyId) -> Result<Option<String>> {
        Ok(self
            .store
            .first_credential(owner, key_id)
            .await?
            .map(|record| record.decoded_value()))
    }

    /// Remove the earliest entry for `key_id`.
    pub async fn delete_credential(&self, owner: &Principal, key_id: &KeyId) -> Result<RecordId> {
        self.delete_with(owner, key_id, None).await
    }

    async fn delete_with(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<RecordId> {
        let removed = self
            .store
            .remove_first_credential(owner, key_id, transaction)
            .await?
            .ok_or_else(|| LedgerError::no_credential(key_id))?;

        tracing::debug!(owner = %owner, key_id = %key_id, "credential deleted");
        Ok(removed.id)
    }

    /// Replace the earliest entry for `key_id` in place. Returns the id of the
    /// replacement.
    pub async fn rotate_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        value: &str,
        label: &str,
    ) -> Result<RecordId> {
        self.rotate_with(owner, key_id, value, label, None).await
    }

    async fn rotate_with(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        value: &str,
        label: &str,
        transaction: Option<&TransactionKey>,
    ) -> Result<RecordId> {
        let replacement = CredentialRecord::new(*owner, *key_id, self.encode_value(value)?, label);
        self.store
            .replace_first_credential(owner, key_id, &replacement, transaction)
            .await?
            .ok_or_else(|| LedgerError::no_credential(key_id))?;

        tracing::debug!(owner = %owner, key_id = %key_id, "credential rotated");
        Ok(replacement.id)
    }

    /// All of the owner's vault entries in position order.
    pub async fn credentials(&self, owner: &Principal) -> Result<Vec<CredentialRecord>> {
        Ok(self.store.credentials_for(owner).await?)
    }

    fn encode_value(&self, value: &str) -> Result<VaultValue> {
        if self.config.reject_oversized_values {
            return VaultValue::encode_checked(value).map_err(|e| match e {
                CoreError::ValueTooLarge { len, capacity } => {
                    LedgerError::ValueTooLarge { len, capacity }
                }
                other => other.into(),
            });
        }
        if value.len() > VAULT_CAPACITY {
            tracing::debug!(len = value.len(), capacity = VAULT_CAPACITY, "truncating vault value");
        }
        Ok(VaultValue::encode(value))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delegation Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Let `grantee` read `key_id` from `owner`'s vault once.
    ///
    /// Distinct nonces are independent grants. Issuing the same tuple again
    /// changes nothing, and a consumed grant stays consumed.
    pub async fn grant(
        &self,
        owner: &Principal,
        grantee: &Principal,
        key_id: &KeyId,
        nonce: u64,
    ) -> Result<u64> {
        self.grant_with(owner, grantee, key_id, nonce, None).await
    }

    async fn grant_with(
        &self,
        owner: &Principal,
        grantee: &Principal,
        key_id: &KeyId,
        nonce: u64,
        transaction: Option<&TransactionKey>,
    ) -> Result<u64> {
        let grant = DelegationGrant::new(*grantee, *owner, *key_id, nonce);
        if grant.is_self_access() {
            if let Some(transaction) = transaction {
                self.store.spend_transaction(transaction).await?;
            }
            return Ok(nonce);
        }

        match self.store.register_grant(&grant.key(), transaction).await? {
            IssueOutcome::Issued => {
                tracing::debug!(owner = %owner, grantee = %grantee, key_id = %key_id, nonce, "grant issued");
            }
            IssueOutcome::AlreadyIssued => {}
            IssueOutcome::AlreadyConsumed => {
                tracing::warn!(owner = %owner, grantee = %grantee, nonce, "re-issue of consumed grant ignored");
            }
        }
        Ok(nonce)
    }

    /// Read `owner`'s entry for `key_id` as `caller`, consuming the grant.
    ///
    /// An owner reading their own entry with nonce 0 needs no grant. If the
    /// entry is gone the read fails but the grant is still spent.
    pub async fn read_via_delegation(
        &self,
        caller: &Principal,
        owner: &Principal,
        key_id: &KeyId,
        nonce: u64,
    ) -> Result<String> {
        let grant = DelegationGrant::new(*caller, *owner, *key_id, nonce);
        Ok(self.release(&grant, None).await?.decoded_value())
    }

    /// Like [`read_via_delegation`](Self::read_via_delegation), but the value
    /// comes back encrypted to `recipient`.
    pub async fn read_via_delegation_sealed(
        &self,
        caller: &Principal,
        owner: &Principal,
        key_id: &KeyId,
        nonce: u64,
        recipient: &X25519PublicKey,
    ) -> Result<SealedValue> {
        let grant = DelegationGrant::new(*caller, *owner, *key_id, nonce);
        let record = self.release(&grant, None).await?;
        Ok(SealedValue::seal(grant.key(), &record.value.to_bytes(), recipient)?)
    }

    /// State of a grant, `None` if it was never issued.
    pub async fn grant_state(&self, grant: &DelegationGrant) -> Result<Option<SlotState>> {
        Ok(self.store.grant_state(&grant.key()).await?)
    }

    async fn release(
        &self,
        grant: &DelegationGrant,
        transaction: Option<&TransactionKey>,
    ) -> Result<CredentialRecord> {
        let grant_key = (!grant.is_self_access()).then(|| grant.key());

        match self
            .store
            .release_credential(grant_key.as_ref(), &grant.owner, &grant.key_id, transaction)
            .await?
        {
            ReleaseResult::Released(record) => {
                if grant_key.is_some() {
                    tracing::debug!(
                        owner = %grant.owner,
                        grantee = %grant.grantee,
                        nonce = grant.nonce,
                        "grant consumed"
                    );
                }
                Ok(record)
            }
            ReleaseResult::NoEntry => Err(LedgerError::no_credential(&grant.key_id)),
            ReleaseResult::GrantConsumed => {
                tracing::warn!(grantee = %grant.grantee, nonce = grant.nonce, "grant replay rejected");
                Err(LedgerError::GrantConsumed)
            }
            ReleaseResult::GrantNotIssued => Err(LedgerError::NoSuchGrant),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Certified Commits
    // ─────────────────────────────────────────────────────────────────────────

    /// Certify `operation` with `certifier` and commit it.
    pub async fn submit<C>(&self, certifier: &C, operation: Operation) -> Result<CommitOutcome>
    where
        C: CertificateService + ?Sized,
    {
        let records = self.store.attestations_for(&certifier.principal()).await?;
        let transaction = certifier.certify(operation, &records).await?;
        self.commit(&transaction).await
    }

    /// Verify a certified transaction and apply it as its signer.
    ///
    /// The certificate must verify and its declared effect must be exactly the
    /// effect the operation has against current state. Otherwise nothing
    /// changes. A transaction commits at most once: committing it again fails
    /// with [`LedgerError::InvalidCertificate`], whatever the first attempt
    /// returned.
    pub async fn commit(&self, transaction: &Transaction) -> Result<CommitOutcome> {
        let signer = *transaction.signer();
        let op = transaction.operation.name();

        match self.apply(transaction).await {
            Ok(outcome) => {
                tracing::info!(op, signer = %signer, "transaction committed");
                Ok(outcome)
            }
            Err(LedgerError::Store(StoreError::TransactionReplayed)) => {
                tracing::warn!(op, signer = %signer, nonce = transaction.nonce, "transaction replay rejected");
                Err(LedgerError::InvalidCertificate(
                    "transaction already committed".into(),
                ))
            }
            Err(e) => {
                tracing::warn!(op, signer = %signer, error = %e, "transaction rejected");
                Err(e)
            }
        }
    }

    async fn apply(&self, transaction: &Transaction) -> Result<CommitOutcome> {
        self.verifier.verify(transaction)?;
        let actor = transaction.signer();
        let key = transaction.key();
        let spend = Some(&key);

        Ok(match &transaction.operation {
            Operation::Attest {
                artifact,
                quality,
                methodology,
            } => {
                let methodology = Methodology::from_code(*methodology)?;
                Quality::new(*quality)?;
                check_effect(
                    transaction,
                    PublicEffect::Increment {
                        artifact: *artifact,
                        quality: *quality,
                    },
                )?;
                CommitOutcome::Attested(
                    self.attest_with(actor, artifact, *quality, methodology, spend)
                        .await?,
                )
            }
            Operation::Revoke { artifact } => {
                let live = self
                    .store
                    .find_attestation(actor, artifact)
                    .await?
                    .ok_or_else(|| LedgerError::no_attestation(artifact))?;
                check_effect(
                    transaction,
                    PublicEffect::Decrement {
                        artifact: *artifact,
                        quality: live.quality.value(),
                    },
                )?;
                CommitOutcome::Revoked(
                    self.revoke_with(actor, artifact, Some(live.quality), spend)
                        .await?,
                )
            }
            Operation::StoreCredential {
                key_id,
                value,
                label,
            } => {
                check_effect(transaction, PublicEffect::None)?;
                CommitOutcome::Stored(self.store_with(actor, key_id, value, label, spend).await?)
            }
            Operation::DeleteCredential { key_id } => {
                check_effect(transaction, PublicEffect::None)?;
                CommitOutcome::Deleted(self.delete_with(actor, key_id, spend).await?)
            }
            Operation::RotateCredential {
                key_id,
                value,
                label,
            } => {
                check_effect(transaction, PublicEffect::None)?;
                CommitOutcome::Rotated(self.rotate_with(actor, key_id, value, label, spend).await?)
            }
            Operation::Grant {
                grantee,
                key_id,
                nonce,
            } => {
                check_effect(transaction, PublicEffect::None)?;
                CommitOutcome::Granted(
                    self.grant_with(actor, grantee, key_id, *nonce, spend)
                        .await?,
                )
            }
            Operation::ReadViaDelegation {
                owner,
                key_id,
                nonce,
            } => {
                check_effect(transaction, PublicEffect::None)?;
                let grant = DelegationGrant::new(*actor, *owner, *key_id, *nonce);
                CommitOutcome::Read(self.release(&grant, spend).await?.decoded_value())
            }
        })
    }
}

fn check_effect(transaction: &Transaction, expected: PublicEffect) -> Result<()> {
    if transaction.effect == expected {
        Ok(())
    } else {
        Err(LedgerError::InvalidCertificate(format!(
            "declared effect {:?} does not match {:?}",
            transaction.effect, expected
        )))
    }
}
