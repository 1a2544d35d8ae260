//! # Attestvault Permissions
//!
//! Delegation grants and sealed delivery of delegated values.
//!
//! ## Key Concepts
//!
//! - **DelegationGrant**: a single-use capability naming grantee, owner,
//!   vault entry and nonce. Its [`GrantKey`](attestvault_core::GrantKey) is
//!   what the store registers and consumes.
//! - **Self access**: an owner reading their own entry with nonce 0 needs no
//!   grant.
//! - **SealedValue**: a delegated value encrypted to the grantee's X25519 key.
//!
//! ## Encryption Model
//!
//! 1. The sender generates an ephemeral X25519 key and agrees with the
//!    grantee's static key.
//! 2. The shared secret is run through Blake3 key derivation together with
//!    the grant key, so a sealed value only opens under the grant it was
//!    released for.
//! 3. The value is encrypted with ChaCha20-Poly1305.
//!
//! ## Usage
//!
//! ```rust
//! use attestvault_core::{KeyId, Keypair};
//! use attestvault_perms::{DelegationGrant, SealedValue, X25519StaticSecret};
//!
//! let owner = Keypair::generate().public_key();
//! let grantee = Keypair::generate().public_key();
//! let grant = DelegationGrant::new(grantee, owner, KeyId::from_label("api"), 1);
//!
//! let grantee_box = X25519StaticSecret::generate();
//! let sealed = SealedValue::seal(grant.key(), b"sk-123", &grantee_box.public_key()).unwrap();
//! assert_eq!(sealed.open(&grantee_box).unwrap(), "sk-123");
//! ```

pub mod crypto;
pub mod error;
pub mod grant;
pub mod sealed;

pub use crypto::{SealNonce, X25519PublicKey, X25519StaticSecret};
pub use error::{PermsError, Result};
pub use grant::{DelegationGrant, SELF_ACCESS_NONCE};
pub use sealed::SealedValue;
