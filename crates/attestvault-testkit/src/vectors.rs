//! Golden test vectors for deterministic verification.
//!
//! These pin the fixed-width codec, content hashing, key derivation and trust
//! classification so that every build agrees on stored bytes and public
//! labels.

use serde::Serialize;

use attestvault_core::{
    classify, display_tier, ArtifactHash, ClaimKey, DisplayTier, GrantKey, KeyId, Keypair,
    TrustLevel, VaultValue,
};

/// A codec vector: one input string and what a vault entry gives back.
#[derive(Debug, Clone)]
pub struct CodecVector {
    pub name: &'static str,
    pub input: String,
    /// Decoded value after a store/get cycle.
    pub expected: String,
    /// Number of chunks holding at least one non-zero byte.
    pub expected_used_chunks: usize,
}

/// Get all codec vectors.
pub fn codec_vectors() -> Vec<CodecVector> {
    vec![
        CodecVector {
            name: "empty value",
            input: String::new(),
            expected: String::new(),
            expected_used_chunks: 0,
        },
        CodecVector {
            name: "short token",
            input: "ghp_abc123".into(),
            expected: "ghp_abc123".into(),
            expected_used_chunks: 1,
        },
        CodecVector {
            name: "exactly one chunk",
            input: "a".repeat(31),
            expected: "a".repeat(31),
            expected_used_chunks: 1,
        },
        CodecVector {
            name: "spills into second chunk",
            input: "a".repeat(32),
            expected: "a".repeat(32),
            expected_used_chunks: 2,
        },
        CodecVector {
            name: "full capacity",
            input: "b".repeat(124),
            expected: "b".repeat(124),
            expected_used_chunks: 4,
        },
        CodecVector {
            name: "one byte over capacity",
            input: "c".repeat(125),
            expected: "c".repeat(124),
            expected_used_chunks: 4,
        },
        CodecVector {
            name: "multi-byte at capacity",
            input: "é".repeat(62),
            expected: "é".repeat(62),
            expected_used_chunks: 4,
        },
        CodecVector {
            name: "truncation splits a character",
            input: format!("a{}", "é".repeat(62)),
            expected: format!("a{}\u{FFFD}", "é".repeat(61)),
            expected_used_chunks: 4,
        },
        CodecVector {
            name: "embedded NUL is dropped",
            input: "a\0b".into(),
            expected: "ab".into(),
            expected_used_chunks: 1,
        },
    ]
}

/// A content hash vector.
#[derive(Debug, Clone)]
pub struct ArtifactVector {
    pub name: &'static str,
    pub artifact: &'static [u8],
    /// SHA-256 with the top three bits of the last byte cleared (hex).
    pub expected_hash: &'static str,
}

pub fn artifact_vectors() -> Vec<ArtifactVector> {
    vec![
        ArtifactVector {
            name: "empty artifact",
            artifact: b"",
            expected_hash: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b815",
        },
        ArtifactVector {
            name: "abc",
            artifact: b"abc",
            expected_hash: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f200150d",
        },
        ArtifactVector {
            name: "hello world",
            artifact: b"hello world",
            expected_hash: "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcd09",
        },
    ]
}

/// A key derivation vector.
#[derive(Debug, Clone)]
pub struct DerivationVector {
    pub name: &'static str,
    pub owner_seed: [u8; 32],
    pub grantee_seed: [u8; 32],
    pub artifact: &'static [u8],
    pub key_label: &'static str,
    pub nonce: u64,
    /// Expected claim key (hex). Empty until pinned.
    pub expected_claim_key: &'static str,
    /// Expected grant key (hex). Empty until pinned.
    pub expected_grant_key: &'static str,
}

pub fn derivation_vectors() -> Vec<DerivationVector> {
    vec![
        DerivationVector {
            name: "basic grant",
            owner_seed: [0x42; 32],
            grantee_seed: [0x43; 32],
            artifact: b"skill",
            key_label: "github",
            nonce: 1,
            expected_claim_key: "",
            expected_grant_key: "",
        },
        DerivationVector {
            name: "zero seeds, max nonce",
            owner_seed: [0x00; 32],
            grantee_seed: [0x01; 32],
            artifact: b"",
            key_label: "",
            nonce: u64::MAX,
            expected_claim_key: "",
            expected_grant_key: "",
        },
        DerivationVector {
            name: "label truncated to key id",
            owner_seed: [0x42; 32],
            grantee_seed: [0x43; 32],
            artifact: b"skill",
            key_label: "a-label-that-is-longer-than-thirty-one-bytes",
            nonce: 1,
            expected_claim_key: "",
            expected_grant_key: "",
        },
    ]
}

/// Derive the (claim key, grant key) pair for a vector.
pub fn derive_from_vector(vector: &DerivationVector) -> (ClaimKey, GrantKey) {
    let owner = Keypair::from_seed(&vector.owner_seed).public_key();
    let grantee = Keypair::from_seed(&vector.grantee_seed).public_key();
    let artifact = ArtifactHash::of_artifact(vector.artifact);
    let key_id = KeyId::from_label(vector.key_label);

    (
        ClaimKey::derive(&owner, &artifact),
        GrantKey::derive(&grantee, &owner, &key_id, vector.nonce),
    )
}

/// (score, count, level) triples, boundaries included.
pub const CLASSIFIER_VECTORS: &[(u64, u64, TrustLevel)] = &[
    (0, 0, TrustLevel::Unscored),
    (1000, 0, TrustLevel::Unscored),
    (0, 1, TrustLevel::Emerging),
    (200, 2, TrustLevel::Emerging),
    (149, 3, TrustLevel::Emerging),
    (150, 3, TrustLevel::Trusted),
    (267, 3, TrustLevel::Trusted),
    (499, 10, TrustLevel::Trusted),
    (1000, 9, TrustLevel::Trusted),
    (500, 10, TrustLevel::Established),
];

/// (score, tier) pairs at the tier boundaries.
pub const DISPLAY_TIER_VECTORS: &[(u64, DisplayTier)] = &[
    (0, DisplayTier::Low),
    (299, DisplayTier::Low),
    (300, DisplayTier::Medium),
    (699, DisplayTier::Medium),
    (700, DisplayTier::High),
];

/// Outcome of checking one vector.
#[derive(Debug, Clone, Serialize)]
pub struct VectorResult {
    pub name: String,
    pub matches: bool,
    pub actual: String,
}

/// Verify every vector.
///
/// Derivation vectors with an empty expectation always match and report the
/// value this build computes.
pub fn verify_all_vectors() -> Vec<VectorResult> {
    let mut results = Vec::new();

    for v in codec_vectors() {
        let value = VaultValue::encode(&v.input);
        let used = value.chunks().iter().filter(|c| c.iter().any(|&b| b != 0)).count();
        let actual = value.decode();
        results.push(VectorResult {
            name: format!("codec: {}", v.name),
            matches: actual == v.expected && used == v.expected_used_chunks,
            actual,
        });
    }

    for v in artifact_vectors() {
        let actual = ArtifactHash::of_artifact(v.artifact).to_hex();
        results.push(VectorResult {
            name: format!("artifact: {}", v.name),
            matches: actual == v.expected_hash,
            actual,
        });
    }

    for v in derivation_vectors() {
        let (claim, grant) = derive_from_vector(&v);
        let (claim, grant) = (claim.to_hex(), grant.to_hex());
        let matches = (v.expected_claim_key.is_empty() || claim == v.expected_claim_key)
            && (v.expected_grant_key.is_empty() || grant == v.expected_grant_key);
        results.push(VectorResult {
            name: format!("derivation: {}", v.name),
            matches,
            actual: format!("{}/{}", claim, grant),
        });
    }

    for &(score, count, expected) in CLASSIFIER_VECTORS {
        let actual = classify(score, count);
        results.push(VectorResult {
            name: format!("classify({}, {})", score, count),
            matches: actual == expected,
            actual: format!("{:?}", actual),
        });
    }

    for &(score, expected) in DISPLAY_TIER_VECTORS {
        let actual = display_tier(score);
        results.push(VectorResult {
            name: format!("display_tier({})", score),
            matches: actual == expected,
            actual: format!("{:?}", actual),
        });
    }

    results
}

/// Verification results as pretty-printed JSON.
pub fn report_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}
