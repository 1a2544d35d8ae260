//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur while sealing or opening delegated values.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error, including authentication failure.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// The envelope was sealed for a different grant.
    #[error("sealed value does not belong to this grant")]
    GrantMismatch,

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
