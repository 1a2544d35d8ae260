//! Delegation grants.
//!
//! A grant lets exactly one grantee perform exactly one read of one vault
//! entry. The tuple `(grantee, owner, key_id, nonce)` is the whole identity of
//! the grant: change any field and it is a different grant.

use serde::{Deserialize, Serialize};

use attestvault_core::{GrantKey, KeyId, Principal};

/// Nonce reserved for an owner reading their own vault.
pub const SELF_ACCESS_NONCE: u64 = 0;

/// A single-use capability to read `key_id` from `owner`'s vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegationGrant {
    /// Who may read.
    pub grantee: Principal,
    /// Whose vault.
    pub owner: Principal,
    /// Which entry.
    pub key_id: KeyId,
    /// Distinguishes repeated grants of the same entry to the same grantee.
    pub nonce: u64,
}

impl DelegationGrant {
    pub fn new(grantee: Principal, owner: Principal, key_id: KeyId, nonce: u64) -> Self {
        Self {
            grantee,
            owner,
            key_id,
            nonce,
        }
    }

    /// The registry key for this exact tuple.
    pub fn key(&self) -> GrantKey {
        GrantKey::derive(&self.grantee, &self.owner, &self.key_id, self.nonce)
    }

    /// An owner reading their own vault with the reserved nonce.
    ///
    /// Such access needs no registered grant and consumes nothing.
    pub fn is_self_access(&self) -> bool {
        self.grantee == self.owner && self.nonce == SELF_ACCESS_NONCE
    }
}
