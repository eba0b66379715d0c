//! Error types for the KMS module.

use std::time::Duration;

use roomkeys_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during KMS operations.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Error from a key primitive.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No master key or provider is configured.
    #[error("kms not configured")]
    Unavailable,

    /// The key ciphertext does not match its context.
    #[error("invalid key")]
    InvalidKey,

    /// The provider refused the request.
    #[error("kms access denied: {0}")]
    AccessDenied(String),

    /// Any other provider failure.
    #[error("kms provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// The provider did not answer in time.
    #[error("kms request timed out after {0:?}")]
    Timeout(Duration),

    /// The randomness source failed.
    #[error("randomness source failed: {0}")]
    Random(String),

    /// A credential could not be parsed or encoded.
    #[error("invalid kms credential: {0}")]
    Credential(String),
}

impl KmsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KmsError::Core(e) => e.kind(),
            KmsError::Unavailable | KmsError::Random(_) => ErrorKind::Unavailable,
            KmsError::InvalidKey | KmsError::AccessDenied(_) => ErrorKind::AccessDenied,
            KmsError::Provider { .. } | KmsError::Timeout(_) => ErrorKind::Provider,
            KmsError::Credential(_) => ErrorKind::Structural,
        }
    }
}

/// Result type for KMS operations.
pub type Result<T> = std::result::Result<T, KmsError>;
