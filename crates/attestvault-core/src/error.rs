//! Error types for Attestvault Core.

use thiserror::Error;

/// Core errors that can occur while encoding values or checking signatures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("value of {len} bytes exceeds codec capacity of {capacity} bytes")]
    ValueTooLarge { len: usize, capacity: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Input validation errors.
///
/// These are raised before any ledger state is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quality {0} is outside 0..=100")]
    InvalidQuality(u64),

    #[error("methodology code {0} is not recognized")]
    InvalidMethodology(u8),
}
