//! Ledger behaviour, run against every storage backend.
//!
//! Each check is written once against `Ledger<S>` and instantiated for the
//! in-memory store and for an on-disk SQLite store.

use anyhow::Result;
use attestvault::core::{ArtifactHash, KeyId, Keypair, Methodology, Principal, TrustLevel};
use attestvault::perms::DelegationGrant;
use attestvault::store::{MemoryStore, SlotState, SqliteStore, Store};
use attestvault::{Ledger, LedgerConfig, LedgerError};

fn principal() -> Principal {
    Keypair::generate().public_key()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

macro_rules! on_every_backend {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[tokio::test]
                async fn $name() -> anyhow::Result<()> {
                    super::init_tracing();
                    let ledger = attestvault::Ledger::new(
                        attestvault::store::MemoryStore::new(),
                        attestvault::LedgerConfig::default(),
                    );
                    super::$name(&ledger).await
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test]
                async fn $name() -> anyhow::Result<()> {
                    super::init_tracing();
                    let dir = tempfile::tempdir()?;
                    let store = attestvault::store::SqliteStore::open(dir.path().join("ledger.db"))?;
                    let ledger = attestvault::Ledger::new(store, attestvault::LedgerConfig::default());
                    super::$name(&ledger).await
                }
            )*
        }
    };
}

on_every_backend!(
    test_attest_updates_aggregate,
    test_second_attest_is_rejected,
    test_revoke_subtracts_only_its_record,
    test_claim_survives_revoke,
    test_revoke_without_record,
    test_vault_resolves_to_earliest,
    test_rotate_replaces_in_place,
    test_missing_vault_entry,
    test_grant_is_single_use,
    test_grant_is_bound_to_entry,
    test_nonces_are_independent,
    test_oversized_value_is_truncated,
    test_three_auditors_reach_trusted,
);

async fn test_attest_updates_aggregate<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");

    let id = ledger
        .attest(&owner, &artifact, 73, Methodology::BehavioralReview)
        .await?;

    assert_eq!(ledger.get_score(&artifact).await?, 73);
    assert_eq!(ledger.get_count(&artifact).await?, 1);

    let records = ledger.attestations(&owner).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].methodology, Methodology::BehavioralReview);
    Ok(())
}

async fn test_second_attest_is_rejected<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");

    ledger
        .attest(&owner, &artifact, 60, Methodology::StaticReview)
        .await?;
    let err = ledger
        .attest(&owner, &artifact, 95, Methodology::SandboxedReview)
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::ClaimConsumed(a) if a == artifact));
    assert_eq!(ledger.get_score(&artifact).await?, 60);
    assert_eq!(ledger.get_count(&artifact).await?, 1);
    assert_eq!(ledger.attestations(&owner).await?.len(), 1);
    Ok(())
}

async fn test_revoke_subtracts_only_its_record<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let a = principal();
    let b = principal();
    let artifact = ArtifactHash::of_artifact(b"shared");

    ledger
        .attest(&a, &artifact, 80, Methodology::StaticReview)
        .await?;
    ledger
        .attest(&b, &artifact, 70, Methodology::StaticReview)
        .await?;
    assert_eq!(ledger.get_score(&artifact).await?, 150);
    assert_eq!(ledger.get_count(&artifact).await?, 2);

    ledger.revoke(&a, &artifact).await?;
    assert_eq!(ledger.get_score(&artifact).await?, 70);
    assert_eq!(ledger.get_count(&artifact).await?, 1);
    assert!(ledger.attestations(&a).await?.is_empty());
    assert_eq!(ledger.attestations(&b).await?.len(), 1);
    Ok(())
}

async fn test_claim_survives_revoke<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");

    ledger
        .attest(&owner, &artifact, 50, Methodology::StaticReview)
        .await?;
    ledger.revoke(&owner, &artifact).await?;
    assert_eq!(ledger.get_count(&artifact).await?, 0);

    for methodology in [
        Methodology::StaticReview,
        Methodology::BehavioralReview,
        Methodology::SandboxedReview,
    ] {
        let err = ledger
            .attest(&owner, &artifact, 50, methodology)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ClaimConsumed(_)));
    }
    assert!(ledger.is_claimed(&owner, &artifact).await?);
    assert_eq!(ledger.get_score(&artifact).await?, 0);
    Ok(())
}

async fn test_revoke_without_record<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");

    let err = ledger.revoke(&owner, &artifact).await.unwrap_err();
    assert!(matches!(err, LedgerError::RecordNotFound(_)));

    ledger
        .attest(&owner, &artifact, 10, Methodology::StaticReview)
        .await?;
    ledger.revoke(&owner, &artifact).await?;
    let err = ledger.revoke(&owner, &artifact).await.unwrap_err();
    assert!(matches!(err, LedgerError::RecordNotFound(_)));
    Ok(())
}

async fn test_vault_resolves_to_earliest<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let key = KeyId::from_label("api");

    let first = ledger.store_credential(&owner, &key, "v1", "one").await?;
    ledger.store_credential(&owner, &key, "v2", "two").await?;
    assert_eq!(ledger.credentials(&owner).await?.len(), 2);
    assert_eq!(ledger.get_credential(&owner, &key).await?.as_deref(), Some("v1"));

    let deleted = ledger.delete_credential(&owner, &key).await?;
    assert_eq!(deleted, first);
    assert_eq!(ledger.credentials(&owner).await?.len(), 1);
    assert_eq!(ledger.get_credential(&owner, &key).await?.as_deref(), Some("v2"));
    Ok(())
}

async fn test_rotate_replaces_in_place<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let key = KeyId::from_label("api");
    let other = KeyId::from_label("other");

    let old = ledger.store_credential(&owner, &key, "old", "a").await?;
    ledger.store_credential(&owner, &other, "x", "b").await?;
    ledger.store_credential(&owner, &key, "later", "c").await?;

    let new = ledger.rotate_credential(&owner, &key, "new", "rotated").await?;
    assert_ne!(new, old);
    assert_eq!(ledger.get_credential(&owner, &key).await?.as_deref(), Some("new"));

    let records = ledger.credentials(&owner).await?;
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].id, new);
    assert_eq!(records[0].label, "rotated");
    assert_eq!(records[1].key_id, other);
    assert_eq!(records[2].decoded_value(), "later");
    Ok(())
}

async fn test_missing_vault_entry<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let key = KeyId::from_label("absent");

    assert_eq!(ledger.get_credential(&owner, &key).await?, None);
    assert!(matches!(
        ledger.delete_credential(&owner, &key).await,
        Err(LedgerError::RecordNotFound(_))
    ));
    assert!(matches!(
        ledger.rotate_credential(&owner, &key, "v", "l").await,
        Err(LedgerError::RecordNotFound(_))
    ));
    assert!(ledger.credentials(&owner).await?.is_empty());
    Ok(())
}

async fn test_grant_is_single_use<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let grantee = principal();
    let key = KeyId::from_label("github");

    ledger.store_credential(&owner, &key, "ghp_abc", "").await?;
    assert_eq!(ledger.grant(&owner, &grantee, &key, 7).await?, 7);

    let value = ledger.read_via_delegation(&grantee, &owner, &key, 7).await?;
    assert_eq!(value, "ghp_abc");

    let err = ledger
        .read_via_delegation(&grantee, &owner, &key, 7)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::GrantConsumed));

    let grant = DelegationGrant::new(grantee, owner, key, 7);
    assert_eq!(ledger.grant_state(&grant).await?, Some(SlotState::Consumed));
    Ok(())
}

async fn test_grant_is_bound_to_entry<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let grantee = principal();
    let stranger = principal();
    let a = KeyId::from_label("a");
    let b = KeyId::from_label("b");

    ledger.store_credential(&owner, &a, "va", "").await?;
    ledger.store_credential(&owner, &b, "vb", "").await?;
    ledger.grant(&owner, &grantee, &a, 1).await?;

    assert!(matches!(
        ledger.read_via_delegation(&grantee, &owner, &b, 1).await,
        Err(LedgerError::NoSuchGrant)
    ));
    assert!(matches!(
        ledger.read_via_delegation(&stranger, &owner, &a, 1).await,
        Err(LedgerError::NoSuchGrant)
    ));
    assert!(matches!(
        ledger.read_via_delegation(&grantee, &owner, &a, 2).await,
        Err(LedgerError::NoSuchGrant)
    ));

    // The failed attempts did not spend the real grant.
    assert_eq!(ledger.read_via_delegation(&grantee, &owner, &a, 1).await?, "va");
    Ok(())
}

async fn test_nonces_are_independent<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let grantee = principal();
    let key = KeyId::from_label("k");

    ledger.store_credential(&owner, &key, "v", "").await?;
    for nonce in 1..=3 {
        ledger.grant(&owner, &grantee, &key, nonce).await?;
    }
    for nonce in 1..=3 {
        assert_eq!(
            ledger.read_via_delegation(&grantee, &owner, &key, nonce).await?,
            "v"
        );
    }
    Ok(())
}

async fn test_oversized_value_is_truncated<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let owner = principal();
    let key = KeyId::from_label("long");
    let value = "z".repeat(125);

    ledger.store_credential(&owner, &key, &value, "").await?;
    let stored = ledger.get_credential(&owner, &key).await?.unwrap_or_default();
    assert_eq!(stored, value[..124]);
    Ok(())
}

async fn test_three_auditors_reach_trusted<S: Store>(ledger: &Ledger<S>) -> Result<()> {
    let artifact = ArtifactHash::of_artifact(b"popular skill");

    for quality in [90, 85, 92] {
        ledger
            .attest(&principal(), &artifact, quality, Methodology::SandboxedReview)
            .await?;
    }

    let aggregate = ledger.aggregate(&artifact).await?;
    assert_eq!((aggregate.score, aggregate.count), (267, 3));
    assert_eq!(ledger.trust_level(&artifact).await?, TrustLevel::Trusted);
    Ok(())
}

#[tokio::test]
async fn test_ledgers_are_isolated() -> Result<()> {
    let first = Ledger::new(MemoryStore::new(), LedgerConfig::default());
    let second = Ledger::new(MemoryStore::new(), LedgerConfig::default());
    let owner = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");

    first
        .attest(&owner, &artifact, 40, Methodology::StaticReview)
        .await?;

    assert_eq!(second.get_score(&artifact).await?, 0);
    second
        .attest(&owner, &artifact, 40, Methodology::StaticReview)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_sqlite_state_survives_reopen() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ledger.db");
    let owner = principal();
    let grantee = principal();
    let artifact = ArtifactHash::of_artifact(b"skill");
    let key = KeyId::from_label("k");

    {
        let ledger = Ledger::new(SqliteStore::open(&path)?, LedgerConfig::default());
        ledger
            .attest(&owner, &artifact, 88, Methodology::StaticReview)
            .await?;
        ledger.revoke(&owner, &artifact).await?;
        ledger
            .attest(&grantee, &artifact, 66, Methodology::StaticReview)
            .await?;
        ledger.store_credential(&owner, &key, "persisted", "").await?;
        ledger.grant(&owner, &grantee, &key, 5).await?;
        ledger.read_via_delegation(&grantee, &owner, &key, 5).await?;
    }

    let ledger = Ledger::new(SqliteStore::open(&path)?, LedgerConfig::default());
    assert_eq!(ledger.get_score(&artifact).await?, 66);
    assert_eq!(ledger.get_count(&artifact).await?, 1);
    assert!(matches!(
        ledger
            .attest(&owner, &artifact, 10, Methodology::StaticReview)
            .await,
        Err(LedgerError::ClaimConsumed(_))
    ));
    assert_eq!(
        ledger.get_credential(&owner, &key).await?.as_deref(),
        Some("persisted")
    );
    assert!(matches!(
        ledger.read_via_delegation(&grantee, &owner, &key, 5).await,
        Err(LedgerError::GrantConsumed)
    ));
    Ok(())
}
