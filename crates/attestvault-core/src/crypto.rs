//! Cryptographic primitives for Attestvault.
//!
//! Wraps Ed25519 signing, SHA-256 content hashing and Blake3 key derivation
//! with strong types.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;
use crate::types::{ArtifactHash, ClaimKey, GrantKey, KeyId, TransactionKey};

/// Derivation context for claim keys.
pub const CLAIM_KEY_CONTEXT: &str = "attestvault-claim-v1";

/// Derivation context for grant keys.
pub const GRANT_KEY_CONTEXT: &str = "attestvault-grant-v1";

/// Derivation context for transaction keys.
pub const TRANSACTION_KEY_CONTEXT: &str = "attestvault-transaction-v1";

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// Any party to the ledger: owner, grantee or caller.
pub type Principal = Ed25519PublicKey;

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Ed25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The zero signature (invalid, used as placeholder).
    pub const ZERO: Self = Self([0u8; 64]);
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for Ed25519Signature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

// serde only derives arrays up to 32 elements; go through a byte vector.
impl Serialize for Ed25519Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
        Ok(Self(arr))
    }
}

/// A keypair for signing certificates.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

impl ArtifactHash {
    /// Compute the content address of an artifact.
    ///
    /// `reduce_to_domain(SHA-256(bytes))`: the digest is read little-endian
    /// and its top three bits are cleared, so every hash is a valid element
    /// of a 253-bit field. Any change to the artifact bytes changes the hash.
    pub fn of_artifact(bytes: &[u8]) -> Self {
        let mut digest: [u8; 32] = Sha256::digest(bytes).into();
        digest[31] &= 0x1f;
        Self(digest)
    }
}

impl ClaimKey {
    /// Derive the claim key for an (owner, artifact) pair.
    pub fn derive(owner: &Principal, artifact: &ArtifactHash) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(CLAIM_KEY_CONTEXT);
        hasher.update(owner.as_bytes());
        hasher.update(artifact.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl GrantKey {
    /// Derive the grant key for an exact (grantee, owner, key, nonce) tuple.
    pub fn derive(grantee: &Principal, owner: &Principal, key_id: &KeyId, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(GRANT_KEY_CONTEXT);
        hasher.update(grantee.as_bytes());
        hasher.update(owner.as_bytes());
        hasher.update(key_id.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl TransactionKey {
    /// Derive the key a signer's transaction spends on commit.
    pub fn derive(signer: &Principal, nonce: u64) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(TRANSACTION_KEY_CONTEXT);
        hasher.update(signer.as_bytes());
        hasher.update(&nonce.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert!(keypair.public_key().verify(tampered, &signature).is_err());
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = Keypair::generate().public_key();
        let recovered = Ed25519PublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, recovered);
    }

    #[test]
    fn test_artifact_hash_is_reduced() {
        for input in [&b""[..], b"skill v1", b"skill v2", &[0xff; 1024]] {
            let hash = ArtifactHash::of_artifact(input);
            assert_eq!(hash.as_bytes()[31] & 0xe0, 0);
        }
    }

    #[test]
    fn test_artifact_hash_changes_with_content() {
        let a = ArtifactHash::of_artifact(b"fn main() {}");
        let b = ArtifactHash::of_artifact(b"fn main() { }");
        assert_ne!(a, b);
        assert_eq!(a, ArtifactHash::of_artifact(b"fn main() {}"));
    }

    #[test]
    fn test_artifact_hash_matches_sha256_prefix() {
        let hash = ArtifactHash::of_artifact(b"abc");
        let digest: [u8; 32] = Sha256::digest(b"abc").into();
        assert_eq!(&hash.as_bytes()[..31], &digest[..31]);
    }

    #[test]
    fn test_claim_key_scoped_to_owner_and_artifact() {
        let alice = Keypair::from_seed(&[1; 32]).public_key();
        let bob = Keypair::from_seed(&[2; 32]).public_key();
        let h1 = ArtifactHash::of_artifact(b"one");
        let h2 = ArtifactHash::of_artifact(b"two");

        let base = ClaimKey::derive(&alice, &h1);
        assert_eq!(base, ClaimKey::derive(&alice, &h1));
        assert_ne!(base, ClaimKey::derive(&bob, &h1));
        assert_ne!(base, ClaimKey::derive(&alice, &h2));
    }

    #[test]
    fn test_grant_key_binds_every_field() {
        let owner = Keypair::from_seed(&[1; 32]).public_key();
        let grantee = Keypair::from_seed(&[2; 32]).public_key();
        let key_a = KeyId::from_label("a");
        let key_b = KeyId::from_label("b");

        let base = GrantKey::derive(&grantee, &owner, &key_a, 7);
        assert_eq!(base, GrantKey::derive(&grantee, &owner, &key_a, 7));
        assert_ne!(base, GrantKey::derive(&owner, &grantee, &key_a, 7));
        assert_ne!(base, GrantKey::derive(&grantee, &owner, &key_b, 7));
        assert_ne!(base, GrantKey::derive(&grantee, &owner, &key_a, 8));
    }

    #[test]
    fn test_transaction_key_scoped_to_signer_and_nonce() {
        let alice = Keypair::from_seed(&[1; 32]).public_key();
        let bob = Keypair::from_seed(&[2; 32]).public_key();

        let base = TransactionKey::derive(&alice, 42);
        assert_eq!(base, TransactionKey::derive(&alice, 42));
        assert_ne!(base, TransactionKey::derive(&bob, 42));
        assert_ne!(base, TransactionKey::derive(&alice, 43));

        // Separate derivation context from grants.
        let grant = GrantKey::derive(&alice, &alice, &KeyId::from_label(""), 42);
        assert_ne!(base.as_bytes(), grant.as_bytes());
    }
}
