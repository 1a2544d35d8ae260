//! # Attestvault Core
//!
//! Pure primitives for Attestvault: identifiers, records, the fixed-width
//! value codec, trust classification and certificates.
//!
//! This crate contains no I/O and no storage.
//!
//! ## Key Types
//!
//! - [`AttestationRecord`] - A private quality signal about an artifact
//! - [`Aggregate`] - Public score and count for an artifact
//! - [`CredentialRecord`] - A secret value in an owner's vault
//! - [`ArtifactHash`] - Content-addressed artifact identifier
//! - [`Transaction`] - A certified ledger operation
//!
//! ## Canonicalization
//!
//! Certificates sign deterministic CBOR. See [`canonical`] module.

pub mod attestation;
pub mod canonical;
pub mod certificate;
pub mod codec;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod trust;
pub mod types;

pub use attestation::{Aggregate, AttestationRecord, Methodology, Quality, MAX_QUALITY};
pub use canonical::{signed_message, CERT_DOMAIN};
pub use certificate::{Certificate, Operation, PublicEffect, Transaction};
pub use codec::{ChunkedValue, VaultValue, CHUNK_BYTES, CHUNK_COUNT, VAULT_CAPACITY};
pub use credential::CredentialRecord;
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Principal};
pub use error::{CoreError, ValidationError};
pub use trust::{average_quality, classify, display_tier, DisplayTier, TrustLevel};
pub use types::{ArtifactHash, ClaimKey, GrantKey, KeyId, RecordId, TransactionKey};
