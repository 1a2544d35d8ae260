//! Attestation records and the public aggregate they feed.
//!
//! An attestation is private to its owner. Only its quality leaves the owner's
//! record set, folded into the per-artifact [`Aggregate`].

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::error::ValidationError;
use crate::trust::{classify, TrustLevel};
use crate::types::{ArtifactHash, RecordId};

/// Highest accepted quality score.
pub const MAX_QUALITY: u64 = 100;

/// A quality signal in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Quality(u8);

impl Quality {
    /// Validate a raw quality score.
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value > MAX_QUALITY {
            return Err(ValidationError::InvalidQuality(value));
        }
        Ok(Self(value as u8))
    }

    /// The score as a u64, ready to be summed.
    pub const fn value(self) -> u64 {
        self.0 as u64
    }
}

impl TryFrom<u64> for Quality {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u64 {
    fn from(quality: Quality) -> Self {
        quality.value()
    }
}

/// How the attester reviewed the artifact.
///
/// Never exposed outside the owner's record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Methodology {
    /// Source inspection without execution.
    StaticReview = 0,
    /// Observation of runtime behaviour.
    BehavioralReview = 1,
    /// Execution inside an isolated sandbox.
    SandboxedReview = 2,
}

impl Methodology {
    /// Convert to the wire code.
    pub fn to_code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code.
    pub fn from_code(code: u8) -> Result<Self, ValidationError> {
        match code {
            0 => Ok(Self::StaticReview),
            1 => Ok(Self::BehavioralReview),
            2 => Ok(Self::SandboxedReview),
            other => Err(ValidationError::InvalidMethodology(other)),
        }
    }
}

impl TryFrom<u8> for Methodology {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

/// A private attestation held in its owner's record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub id: RecordId,
    pub owner: Principal,
    pub artifact: ArtifactHash,
    pub quality: Quality,
    pub methodology: Methodology,
}

impl AttestationRecord {
    /// Create a record with a fresh identity.
    pub fn new(
        owner: Principal,
        artifact: ArtifactHash,
        quality: Quality,
        methodology: Methodology,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            owner,
            artifact,
            quality,
            methodology,
        }
    }
}

/// Public per-artifact totals.
///
/// `score` is the sum of quality over live attestations, `count` their number.
/// Both saturate at zero on decrement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    pub score: u64,
    pub count: u64,
}

impl Aggregate {
    /// Fold in a new attestation.
    pub fn increment(&mut self, quality: Quality) {
        self.score = self.score.saturating_add(quality.value());
        self.count = self.count.saturating_add(1);
    }

    /// Remove a revoked attestation.
    pub fn decrement(&mut self, quality: Quality) {
        self.score = self.score.saturating_sub(quality.value());
        self.count = self.count.saturating_sub(1);
    }

    /// True if no live attestation contributes.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Classify these totals.
    pub fn trust_level(&self) -> TrustLevel {
        classify(self.score, self.count)
    }
}
