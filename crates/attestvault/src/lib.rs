//! # Attestvault
//!
//! Private attestations with public trust scores, and a credential vault with
//! single-use delegated reads.
//!
//! ## Overview
//!
//! - **Attestations**: an owner records a quality signal (0-100) for an
//!   artifact. The record is private; only the artifact's summed score and
//!   attester count are public.
//! - **Claims**: each owner attests an artifact at most once, ever. Revoking
//!   does not give the claim back.
//! - **Vault**: per-owner ordered entries of short secret values, looked up by
//!   key id. Reads resolve to the earliest entry.
//! - **Delegation**: an owner grants a grantee exactly one read of one entry.
//! - **Certificates**: every operation can be submitted as a signed
//!   transaction whose declared public effect is checked before commit.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use attestvault::{Ledger, LedgerConfig};
//! use attestvault::core::{ArtifactHash, KeyId, Keypair, Methodology};
//! use attestvault::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("attestvault.db").unwrap();
//!     let ledger = Ledger::new(store, LedgerConfig::default());
//!
//!     let auditor = Keypair::generate().public_key();
//!     let artifact = ArtifactHash::of_artifact(b"skill bytes");
//!     ledger
//!         .attest(&auditor, &artifact, 90, Methodology::SandboxedReview)
//!         .await
//!         .unwrap();
//!     assert_eq!(ledger.get_score(&artifact).await.unwrap(), 90);
//!
//!     let owner = Keypair::generate().public_key();
//!     let agent = Keypair::generate().public_key();
//!     let key = KeyId::from_label("github");
//!     ledger.store_credential(&owner, &key, "ghp_abc", "token").await.unwrap();
//!     ledger.grant(&owner, &agent, &key, 1).await.unwrap();
//!     let value = ledger.read_via_delegation(&agent, &owner, &key, 1).await.unwrap();
//!     assert_eq!(value, "ghp_abc");
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `attestvault::core` - Records, codec, trust classification, certificates
//! - `attestvault::store` - Storage abstraction, SQLite and in-memory backends
//! - `attestvault::perms` - Delegation grants and sealed delivery

pub mod certify;
pub mod config;
pub mod error;
pub mod ledger;
pub mod verify;

// Re-export component crates
pub use attestvault_core as core;
pub use attestvault_perms as perms;
pub use attestvault_store as store;

// Re-export main types for convenience
pub use certify::{expected_effect, CertificateService, KeypairCertifier};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{CommitOutcome, Ledger};
pub use verify::{CertificateVerifier, SignatureVerifier};

// Re-export commonly used core types
pub use attestvault_core::{
    Aggregate, ArtifactHash, AttestationRecord, CredentialRecord, KeyId, Keypair, Methodology,
    Operation, Principal, PublicEffect, Quality, RecordId, Transaction, TransactionKey,
    TrustLevel,
};
