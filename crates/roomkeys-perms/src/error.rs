//! Error types for the permissions module.

use roomkeys_core::{CoreError, ErrorKind};
use roomkeys_kms::KmsError;
use thiserror::Error;

/// Errors that can occur during capability and grant operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The caller holds no usable capability.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A stored capability is not of the expected kind.
    #[error("wrong capability kind: expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    /// Capability serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The capability table failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// KMS error.
    #[error("kms error: {0}")]
    Kms(#[from] KmsError),
}

impl PermsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PermsError::AccessDenied(_) => ErrorKind::AccessDenied,
            PermsError::WrongKind { .. } | PermsError::Serialization(_) => ErrorKind::Structural,
            PermsError::Storage(_) => ErrorKind::Provider,
            PermsError::Core(e) => e.kind(),
            PermsError::Kms(e) => e.kind(),
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
