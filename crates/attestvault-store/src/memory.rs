//! In-memory implementation of the Store trait.
//!
//! Primarily for tests and short-lived ledgers. Same semantics as SQLite but
//! nothing is persisted. Each compound operation runs under a single write
//! guard, which is what makes it atomic.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use attestvault_core::{
    Aggregate, ArtifactHash, AttestationRecord, ClaimKey, CredentialRecord, GrantKey, KeyId,
    Principal, Quality, TransactionKey,
};

use crate::consumption::{ConsumeOutcome, ConsumptionRegistry, IssueOutcome, SlotState};
use crate::error::{Result, StoreError};
use crate::traits::{CommitResult, ReleaseResult, RemoveResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Per-owner attestation sets, in insertion order.
    attestations: HashMap<Principal, Vec<AttestationRecord>>,

    /// Public aggregate.
    aggregates: HashMap<ArtifactHash, Aggregate>,

    /// Claim registry.
    claims: ConsumptionRegistry<ClaimKey>,

    /// Per-owner vaults, in position order.
    credentials: HashMap<Principal, Vec<CredentialRecord>>,

    /// Delegation grants.
    grants: ConsumptionRegistry<GrantKey>,

    /// Spent transaction keys.
    transactions: ConsumptionRegistry<TransactionKey>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    /// Spend a transaction key ahead of the write it guards.
    fn spend(&mut self, transaction: Option<&TransactionKey>) -> Result<()> {
        match transaction {
            Some(key) if self.transactions.claim(*key) == ConsumeOutcome::AlreadyConsumed => {
                Err(StoreError::TransactionReplayed)
            }
            _ => Ok(()),
        }
    }

    fn first_credential(&self, owner: &Principal, key_id: &KeyId) -> Option<&CredentialRecord> {
        self.credentials
            .get(owner)
            .and_then(|vault| vault.iter().find(|r| &r.key_id == key_id))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn commit_attestation(
        &self,
        record: &AttestationRecord,
        claim: &ClaimKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<CommitResult> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;

        if inner.claims.claim(*claim) == ConsumeOutcome::AlreadyConsumed {
            return Ok(CommitResult::ClaimConsumed);
        }

        inner
            .attestations
            .entry(record.owner)
            .or_default()
            .push(record.clone());

        let aggregate = inner.aggregates.entry(record.artifact).or_default();
        aggregate.increment(record.quality);

        Ok(CommitResult::Committed {
            aggregate: *aggregate,
        })
    }

    async fn remove_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
        expected_quality: Option<Quality>,
        transaction: Option<&TransactionKey>,
    ) -> Result<RemoveResult> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;

        let Some(records) = inner.attestations.get_mut(owner) else {
            return Ok(RemoveResult::NotFound);
        };
        let Some(index) = records.iter().position(|r| &r.artifact == artifact) else {
            return Ok(RemoveResult::NotFound);
        };

        let live = records[index].quality;
        if expected_quality.is_some_and(|q| q != live) {
            return Ok(RemoveResult::QualityMismatch { live });
        }

        let record = records.remove(index);
        let aggregate = inner.aggregates.entry(*artifact).or_default();
        aggregate.decrement(record.quality);

        Ok(RemoveResult::Removed {
            record,
            aggregate: *aggregate,
        })
    }

    async fn find_attestation(
        &self,
        owner: &Principal,
        artifact: &ArtifactHash,
    ) -> Result<Option<AttestationRecord>> {
        let inner = self.read()?;
        Ok(inner
            .attestations
            .get(owner)
            .and_then(|records| records.iter().find(|r| &r.artifact == artifact))
            .cloned())
    }

    async fn attestations_for(&self, owner: &Principal) -> Result<Vec<AttestationRecord>> {
        let inner = self.read()?;
        Ok(inner.attestations.get(owner).cloned().unwrap_or_default())
    }

    async fn aggregate(&self, artifact: &ArtifactHash) -> Result<Aggregate> {
        let inner = self.read()?;
        Ok(inner.aggregates.get(artifact).copied().unwrap_or_default())
    }

    async fn is_claimed(&self, claim: &ClaimKey) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.claims.is_consumed(claim))
    }

    async fn append_credential(
        &self,
        record: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<()> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;
        inner
            .credentials
            .entry(record.owner)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
    ) -> Result<Option<CredentialRecord>> {
        let inner = self.read()?;
        Ok(inner.first_credential(owner, key_id).cloned())
    }

    async fn credentials_for(&self, owner: &Principal) -> Result<Vec<CredentialRecord>> {
        let inner = self.read()?;
        Ok(inner.credentials.get(owner).cloned().unwrap_or_default())
    }

    async fn remove_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;
        let Some(vault) = inner.credentials.get_mut(owner) else {
            return Ok(None);
        };
        Ok(vault
            .iter()
            .position(|r| &r.key_id == key_id)
            .map(|index| vault.remove(index)))
    }

    async fn replace_first_credential(
        &self,
        owner: &Principal,
        key_id: &KeyId,
        replacement: &CredentialRecord,
        transaction: Option<&TransactionKey>,
    ) -> Result<Option<CredentialRecord>> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;
        let Some(slot) = inner
            .credentials
            .get_mut(owner)
            .and_then(|vault| vault.iter_mut().find(|r| &r.key_id == key_id))
        else {
            return Ok(None);
        };
        Ok(Some(std::mem::replace(slot, replacement.clone())))
    }

    async fn register_grant(
        &self,
        key: &GrantKey,
        transaction: Option<&TransactionKey>,
    ) -> Result<IssueOutcome> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;
        Ok(inner.grants.issue(*key))
    }

    async fn consume_grant(&self, key: &GrantKey) -> Result<ConsumeOutcome> {
        let mut inner = self.write()?;
        Ok(inner.grants.consume(key))
    }

    async fn release_credential(
        &self,
        grant: Option<&GrantKey>,
        owner: &Principal,
        key_id: &KeyId,
        transaction: Option<&TransactionKey>,
    ) -> Result<ReleaseResult> {
        let mut inner = self.write()?;
        inner.spend(transaction)?;

        if let Some(grant) = grant {
            match inner.grants.consume(grant) {
                ConsumeOutcome::Consumed => {}
                ConsumeOutcome::AlreadyConsumed => return Ok(ReleaseResult::GrantConsumed),
                ConsumeOutcome::NotIssued => return Ok(ReleaseResult::GrantNotIssued),
            }
        }

        Ok(match inner.first_credential(owner, key_id) {
            Some(record) => ReleaseResult::Released(record.clone()),
            None => ReleaseResult::NoEntry,
        })
    }

    async fn grant_state(&self, key: &GrantKey) -> Result<Option<SlotState>> {
        let inner = self.read()?;
        Ok(inner.grants.state(key))
    }

    async fn spend_transaction(&self, transaction: &TransactionKey) -> Result<()> {
        self.write()?.spend(Some(transaction))
    }

    async fn is_transaction_spent(&self, transaction: &TransactionKey) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.transactions.is_consumed(transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestvault_core::{Keypair, Methodology, VaultValue};

    fn record(owner: Principal, artifact: &[u8], quality: u64) -> AttestationRecord {
        AttestationRecord::new(
            owner,
            ArtifactHash::of_artifact(artifact),
            Quality::new(quality).unwrap(),
            Methodology::StaticReview,
        )
    }

    #[tokio::test]
    async fn test_commit_then_claim_consumed() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let rec = record(owner, b"skill", 80);
        let claim = ClaimKey::derive(&owner, &rec.artifact);

        let first = store.commit_attestation(&rec, &claim, None).await.unwrap();
        assert_eq!(
            first,
            CommitResult::Committed {
                aggregate: Aggregate { score: 80, count: 1 }
            }
        );

        let again = record(owner, b"skill", 10);
        let second = store.commit_attestation(&again, &claim, None).await.unwrap();
        assert_eq!(second, CommitResult::ClaimConsumed);

        assert_eq!(
            store.aggregate(&rec.artifact).await.unwrap(),
            Aggregate { score: 80, count: 1 }
        );
        assert_eq!(store.attestations_for(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_respects_expected_quality() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let rec = record(owner, b"skill", 80);
        let claim = ClaimKey::derive(&owner, &rec.artifact);
        store.commit_attestation(&rec, &claim, None).await.unwrap();

        let mismatch = store
            .remove_attestation(&owner, &rec.artifact, Some(Quality::new(79).unwrap()), None)
            .await
            .unwrap();
        assert_eq!(
            mismatch,
            RemoveResult::QualityMismatch {
                live: Quality::new(80).unwrap()
            }
        );
        assert_eq!(store.aggregate(&rec.artifact).await.unwrap().count, 1);

        let removed = store
            .remove_attestation(&owner, &rec.artifact, Some(Quality::new(80).unwrap()), None)
            .await
            .unwrap();
        assert!(matches!(removed, RemoveResult::Removed { aggregate, .. } if aggregate == Aggregate::default()));
        assert!(store.is_claimed(&claim).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_keeps_position() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let a = KeyId::from_label("a");
        let b = KeyId::from_label("b");

        store
            .append_credential(&CredentialRecord::new(owner, a, VaultValue::encode("a1"), "a1"), None)
            .await
            .unwrap();
        store
            .append_credential(&CredentialRecord::new(owner, b, VaultValue::encode("b1"), "b1"), None)
            .await
            .unwrap();

        let first = store.first_credential(&owner, &a).await.unwrap().unwrap();
        let replacement = first.rotated(VaultValue::encode("a2"), "a2");
        let old = store
            .replace_first_credential(&owner, &a, &replacement, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.id, first.id);

        let vault = store.credentials_for(&owner).await.unwrap();
        assert_eq!(vault.len(), 2);
        assert_eq!(vault[0].id, replacement.id);
        assert_eq!(vault[0].decoded_value(), "a2");
        assert_eq!(vault[1].key_id, b);
    }

    #[tokio::test]
    async fn test_grant_lifecycle() {
        let store = MemoryStore::new();
        let key = GrantKey::from_bytes([3; 32]);

        assert_eq!(store.consume_grant(&key).await.unwrap(), ConsumeOutcome::NotIssued);
        assert_eq!(store.register_grant(&key, None).await.unwrap(), IssueOutcome::Issued);
        assert_eq!(store.consume_grant(&key).await.unwrap(), ConsumeOutcome::Consumed);
        assert_eq!(
            store.register_grant(&key, None).await.unwrap(),
            IssueOutcome::AlreadyConsumed
        );
        assert_eq!(
            store.consume_grant(&key).await.unwrap(),
            ConsumeOutcome::AlreadyConsumed
        );
    }

    #[tokio::test]
    async fn test_vaults_are_isolated() {
        let store = MemoryStore::new();
        let alice = Keypair::generate().public_key();
        let bob = Keypair::generate().public_key();
        let key = KeyId::from_label("shared-name");

        store
            .append_credential(&CredentialRecord::new(alice, key, VaultValue::encode("secret"), ""), None)
            .await
            .unwrap();

        assert!(store.first_credential(&bob, &key).await.unwrap().is_none());
        assert!(store.remove_first_credential(&bob, &key, None).await.unwrap().is_none());
        assert!(store.first_credential(&alice, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spent_transaction_blocks_write() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let key = KeyId::from_label("k");
        let tx = TransactionKey::from_bytes([5; 32]);

        for label in ["one", "two"] {
            store
                .append_credential(&CredentialRecord::new(owner, key, VaultValue::encode(label), label), None)
                .await
                .unwrap();
        }

        let removed = store.remove_first_credential(&owner, &key, Some(&tx)).await.unwrap();
        assert_eq!(removed.map(|r| r.decoded_value()), Some("one".to_string()));
        assert!(store.is_transaction_spent(&tx).await.unwrap());

        let replayed = store.remove_first_credential(&owner, &key, Some(&tx)).await;
        assert!(matches!(replayed, Err(StoreError::TransactionReplayed)));
        assert_eq!(store.credentials_for(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_spent_even_when_nothing_found() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let key = KeyId::from_label("later");
        let tx = TransactionKey::from_bytes([6; 32]);

        assert!(store
            .remove_first_credential(&owner, &key, Some(&tx))
            .await
            .unwrap()
            .is_none());

        store
            .append_credential(&CredentialRecord::new(owner, key, VaultValue::encode("v"), ""), None)
            .await
            .unwrap();
        assert!(matches!(
            store.remove_first_credential(&owner, &key, Some(&tx)).await,
            Err(StoreError::TransactionReplayed)
        ));
        assert!(store.first_credential(&owner, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_release_consumes_grant_and_reads() {
        let store = MemoryStore::new();
        let owner = Keypair::generate().public_key();
        let key = KeyId::from_label("k");
        let grant = GrantKey::from_bytes([4; 32]);

        assert_eq!(
            store.release_credential(Some(&grant), &owner, &key, None).await.unwrap(),
            ReleaseResult::GrantNotIssued
        );

        store.register_grant(&grant, None).await.unwrap();
        assert_eq!(
            store.release_credential(Some(&grant), &owner, &key, None).await.unwrap(),
            ReleaseResult::NoEntry
        );
        assert_eq!(
            store.release_credential(Some(&grant), &owner, &key, None).await.unwrap(),
            ReleaseResult::GrantConsumed
        );

        store
            .append_credential(&CredentialRecord::new(owner, key, VaultValue::encode("v"), ""), None)
            .await
            .unwrap();
        assert!(matches!(
            store.release_credential(None, &owner, &key, None).await.unwrap(),
            ReleaseResult::Released(record) if record.decoded_value() == "v"
        ));
    }
}
