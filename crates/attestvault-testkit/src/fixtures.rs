//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use attestvault::{KeypairCertifier, Ledger, LedgerConfig};
use attestvault_core::{ArtifactHash, Ed25519PublicKey, KeyId, Keypair, Methodology, Operation};
use attestvault_store::{MemoryStore, SqliteStore, StoreError};

/// A test fixture with a keypair and a ledger over a memory store.
pub struct TestFixture {
    pub keypair: Keypair,
    pub ledger: Ledger<MemoryStore>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_config(seed, LedgerConfig::default())
    }

    pub fn with_config(seed: [u8; 32], config: LedgerConfig) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            ledger: Ledger::new(MemoryStore::new(), config),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// A certifier signing as this fixture's principal.
    pub fn certifier(&self) -> KeypairCertifier {
        KeypairCertifier::new(self.keypair.clone())
    }

    /// Content hash of a named test artifact.
    pub fn artifact(name: &str) -> ArtifactHash {
        ArtifactHash::of_artifact(name.as_bytes())
    }

    pub fn key_id(label: &str) -> KeyId {
        KeyId::from_label(label)
    }

    /// An attest operation for this fixture to certify.
    pub fn attest_op(artifact: ArtifactHash, quality: u64, methodology: Methodology) -> Operation {
        Operation::Attest {
            artifact,
            quality,
            methodology: methodology.to_code(),
        }
    }

    /// A grant of `key_id` from this fixture to `grantee`.
    pub fn grant_op(grantee: &Ed25519PublicKey, key_id: KeyId, nonce: u64) -> Operation {
        Operation::Grant {
            grantee: *grantee,
            key_id,
            nonce,
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create several parties sharing one ledger state.
///
/// Every fixture holds its own `Ledger` handle, but all of them read and write
/// the same store.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    let store = Arc::new(MemoryStore::new());
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[1] = (i >> 8) as u8;
            TestFixture {
                keypair: Keypair::from_seed(&seed),
                ledger: Ledger::with_shared_store(Arc::clone(&store), LedgerConfig::default()),
            }
        })
        .collect()
}

/// Open a ledger over an on-disk SQLite database at `path`.
///
/// Reopening the same path sees everything committed before.
pub fn sqlite_ledger(path: impl AsRef<Path>) -> Result<Ledger<SqliteStore>, StoreError> {
    Ok(Ledger::new(SqliteStore::open(path)?, LedgerConfig::default()))
}
