//! Strong type definitions for Attestvault.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::{self, CHUNK_BYTES};

/// Defines a 32-byte identifier newtype with hex helpers.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $debug:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
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

            /// The all-zero value (sentinel).
            pub const ZERO: Self = Self([0u8; 32]);
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug, "({})"), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

id_type!(
    /// Identity of a single private record (attestation or credential).
    ///
    /// Random, so a rotated credential gets a fresh identity even when its
    /// contents are unchanged.
    RecordId,
    "RecordId"
);

id_type!(
    /// Content-addressed identifier of an audited artifact.
    ///
    /// Derived by [`ArtifactHash::of_artifact`].
    ArtifactHash,
    "ArtifactHash"
);

id_type!(
    /// Key of a claim in the claim registry: a digest of (owner, artifact).
    ClaimKey,
    "ClaimKey"
);

id_type!(
    /// Key of a delegation grant: a digest of (grantee, owner, key id, nonce).
    GrantKey,
    "GrantKey"
);

id_type!(
    /// Key of a committed transaction: a digest of (signer, transaction nonce).
    ///
    /// Spent exactly once, when the transaction is committed.
    TransactionKey,
    "TransactionKey"
);

impl RecordId {
    /// Generate a fresh random record identity.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// Identifier of a vault entry, packed into a single codec chunk.
///
/// Derived from a human label by truncating its UTF-8 bytes to 31 bytes.
/// The mapping is lossy: two labels sharing their first 31 bytes collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId(pub [u8; CHUNK_BYTES]);

impl KeyId {
    /// Pack a label into a key id.
    pub fn from_label(label: &str) -> Self {
        let [chunk] = codec::encode::<1, CHUNK_BYTES>(label);
        Self(chunk)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; CHUNK_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; CHUNK_BYTES] {
        &self.0
    }

    /// Recover the (possibly truncated) label.
    pub fn label(&self) -> String {
        codec::decode::<1, CHUNK_BYTES>(&[self.0])
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({:?})", self.label())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<&str> for KeyId {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
