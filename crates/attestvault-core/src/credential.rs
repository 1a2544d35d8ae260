//! Credential vault records.

use serde::{Deserialize, Serialize};

use crate::codec::VaultValue;
use crate::crypto::Principal;
use crate::types::{KeyId, RecordId};

/// A secret value held in its owner's vault.
///
/// Several records may share a `key_id`; lookups resolve to the earliest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: RecordId,
    pub owner: Principal,
    pub key_id: KeyId,
    pub value: VaultValue,
    pub label: String,
}

impl CredentialRecord {
    /// Create a record with a fresh identity.
    pub fn new(owner: Principal, key_id: KeyId, value: VaultValue, label: impl Into<String>) -> Self {
        Self {
            id: RecordId::generate(),
            owner,
            key_id,
            value,
            label: label.into(),
        }
    }

    /// The same entry with new contents and a new identity.
    pub fn rotated(&self, value: VaultValue, label: impl Into<String>) -> Self {
        Self::new(self.owner, self.key_id, value, label)
    }

    /// Decode the stored value.
    pub fn decoded_value(&self) -> String {
        self.value.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn test_rotated_keeps_owner_and_key() {
        let owner = Keypair::generate().public_key();
        let key = KeyId::from_label("api");
        let original = CredentialRecord::new(owner, key, VaultValue::encode("old"), "first");
        let rotated = original.rotated(VaultValue::encode("new"), "second");

        assert_ne!(original.id, rotated.id);
        assert_eq!(rotated.owner, owner);
        assert_eq!(rotated.key_id, key);
        assert_eq!(rotated.decoded_value(), "new");
        assert_eq!(rotated.label, "second");
    }

    #[test]
    fn test_debug_does_not_leak_value() {
        let owner = Keypair::generate().public_key();
        let record = CredentialRecord::new(
            owner,
            KeyId::from_label("db"),
            VaultValue::encode("p@ssw0rd"),
            "database",
        );
        assert!(!format!("{:?}", record).contains("p@ssw0rd"));
    }
}
