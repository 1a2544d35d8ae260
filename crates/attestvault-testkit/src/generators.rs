//! Proptest generators for property-based testing.

use proptest::prelude::*;

use attestvault_core::{
    ArtifactHash, Ed25519PublicKey, KeyId, Keypair, Methodology, Operation, PublicEffect,
    Transaction, MAX_QUALITY,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

/// Generate the content hash of random artifact bytes.
pub fn artifact_hash() -> impl Strategy<Value = ArtifactHash> {
    prop::collection::vec(any::<u8>(), 0..256).prop_map(|bytes| ArtifactHash::of_artifact(&bytes))
}

/// Generate a valid quality.
pub fn quality() -> impl Strategy<Value = u64> {
    0..=MAX_QUALITY
}

/// Generate a quality that must be rejected.
pub fn invalid_quality() -> impl Strategy<Value = u64> {
    (MAX_QUALITY + 1)..=u64::MAX
}

pub fn methodology() -> impl Strategy<Value = Methodology> {
    prop_oneof![
        Just(Methodology::StaticReview),
        Just(Methodology::BehavioralReview),
        Just(Methodology::SandboxedReview),
    ]
}

/// Generate a key label, sometimes longer than a key id holds.
pub fn key_label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,40}".prop_map(String::from)
}

pub fn key_id() -> impl Strategy<Value = KeyId> {
    key_label().prop_map(|label| KeyId::from_label(&label))
}

/// Generate a vault value with no NUL characters.
///
/// Up to 60 characters, so multi-byte input can run past capacity.
pub fn vault_value() -> impl Strategy<Value = String> {
    "[^\\x00]{0,60}".prop_map(String::from)
}

/// Generate any operation with well-formed fields.
pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (artifact_hash(), quality(), methodology()).prop_map(|(artifact, quality, m)| {
            Operation::Attest {
                artifact,
                quality,
                methodology: m.to_code(),
            }
        }),
        artifact_hash().prop_map(|artifact| Operation::Revoke { artifact }),
        (key_id(), vault_value(), key_label()).prop_map(|(key_id, value, label)| {
            Operation::StoreCredential {
                key_id,
                value,
                label,
            }
        }),
        key_id().prop_map(|key_id| Operation::DeleteCredential { key_id }),
        (key_id(), vault_value(), key_label()).prop_map(|(key_id, value, label)| {
            Operation::RotateCredential {
                key_id,
                value,
                label,
            }
        }),
        (public_key(), key_id(), any::<u64>()).prop_map(|(grantee, key_id, nonce)| {
            Operation::Grant {
                grantee,
                key_id,
                nonce,
            }
        }),
        (public_key(), key_id(), any::<u64>()).prop_map(|(owner, key_id, nonce)| {
            Operation::ReadViaDelegation {
                owner,
                key_id,
                nonce,
            }
        }),
    ]
}

/// Parameters for generating an attestation.
#[derive(Debug, Clone)]
pub struct AttestParams {
    pub keypair: Keypair,
    pub artifact: ArtifactHash,
    pub quality: u64,
    pub methodology: Methodology,
}

impl Arbitrary for AttestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any::<[u8; 32]>(), artifact_hash(), quality(), methodology())
            .prop_map(|(seed, artifact, quality, methodology)| AttestParams {
                keypair: Keypair::from_seed(&seed),
                artifact,
                quality,
                methodology,
            })
            .boxed()
    }
}

/// Sign an attest transaction from parameters, declaring its true effect.
pub fn transaction_from_params(params: &AttestParams) -> Transaction {
    let operation = Operation::Attest {
        artifact: params.artifact,
        quality: params.quality,
        methodology: params.methodology.to_code(),
    };
    let effect = PublicEffect::Increment {
        artifact: params.artifact,
        quality: params.quality,
    };
    Transaction::sign(&params.keypair, operation, effect)
        .expect("attest operations always encode")
}
