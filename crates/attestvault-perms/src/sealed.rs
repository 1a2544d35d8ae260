//! Sealed delivery of delegated values.
//!
//! A delegated read can hand the value back encrypted to the grantee's X25519
//! key instead of in the clear. The sender side uses a fresh ephemeral key per
//! value, and the symmetric key is bound to the grant it was released under.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use attestvault_core::GrantKey;

use crate::crypto::{EphemeralKeyPair, SealNonce, X25519PublicKey, X25519StaticSecret};
use crate::error::{PermsError, Result};

/// A value encrypted for one grantee under one grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// The grant this value was released under.
    pub grant: GrantKey,

    /// Sender's ephemeral X25519 public key.
    pub ephemeral_public: X25519PublicKey,

    /// ChaCha20-Poly1305 ciphertext with tag.
    pub ciphertext: Vec<u8>,

    pub nonce: SealNonce,
}

impl SealedValue {
    /// Encrypt `plaintext` for `recipient`.
    pub fn seal(grant: GrantKey, plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let key = ephemeral.agree(recipient).sealing_key(&grant);

        let nonce = SealNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            grant,
            ephemeral_public,
            ciphertext,
            nonce,
        })
    }

    /// Decrypt to raw bytes.
    pub fn open_bytes(&self, recipient: &X25519StaticSecret) -> Result<Bytes> {
        let key = recipient
            .agree(&self.ephemeral_public)
            .sealing_key(&self.grant);
        key.decrypt(&self.ciphertext, &self.nonce).map(Bytes::from)
    }

    /// Decrypt to a string, replacing invalid UTF-8 like vault reads do.
    pub fn open(&self, recipient: &X25519StaticSecret) -> Result<String> {
        let bytes = self.open_bytes(recipient)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decrypt only if this value was released under `expected`.
    pub fn open_for(&self, expected: &GrantKey, recipient: &X25519StaticSecret) -> Result<String> {
        if &self.grant != expected {
            return Err(PermsError::GrantMismatch);
        }
        self.open(recipient)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = X25519StaticSecret::generate();
        let grant = GrantKey::from_bytes([0x42; 32]);

        let sealed = SealedValue::seal(grant, b"ghp_abc123", &recipient.public_key()).unwrap();
        assert_eq!(sealed.open(&recipient).unwrap(), "ghp_abc123");
        assert_eq!(sealed.open_for(&grant, &recipient).unwrap(), "ghp_abc123");
    }

    #[test]
    fn test_other_recipient_cannot_open() {
        let recipient = X25519StaticSecret::generate();
        let eavesdropper = X25519StaticSecret::generate();
        let sealed = SealedValue::seal(GrantKey::ZERO, b"secret", &recipient.public_key()).unwrap();

        assert!(matches!(
            sealed.open(&eavesdropper),
            Err(PermsError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_relabelled_grant_fails_authentication() {
        let recipient = X25519StaticSecret::generate();
        let mut sealed =
            SealedValue::seal(GrantKey::from_bytes([1; 32]), b"secret", &recipient.public_key())
                .unwrap();

        sealed.grant = GrantKey::from_bytes([2; 32]);
        assert!(sealed.open(&recipient).is_err());
    }

    #[test]
    fn test_open_for_wrong_grant() {
        let recipient = X25519StaticSecret::generate();
        let sealed = SealedValue::seal(GrantKey::ZERO, b"x", &recipient.public_key()).unwrap();

        assert!(matches!(
            sealed.open_for(&GrantKey::from_bytes([9; 32]), &recipient),
            Err(PermsError::GrantMismatch)
        ));
    }

    #[test]
    fn test_cbor_roundtrip() {
        let recipient = X25519StaticSecret::generate();
        let sealed = SealedValue::seal(GrantKey::ZERO, b"wire", &recipient.public_key()).unwrap();

        let bytes = sealed.to_bytes().unwrap();
        let decoded = SealedValue::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, sealed);
        assert_eq!(decoded.open(&recipient).unwrap(), "wire");
    }
}
