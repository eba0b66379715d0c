//! Error types for Roomkeys.

use roomkeys_core::{CoreError, ErrorKind};
use roomkeys_kms::KmsError;
use roomkeys_perms::PermsError;
use roomkeys_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Roomkeys operations.
#[derive(Debug, Error)]
pub enum RoomkeysError {
    /// Key primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// KMS error.
    #[error("kms error: {0}")]
    Kms(#[from] KmsError),

    /// Permission error.
    #[error("permission error: {0}")]
    Permission(#[from] PermsError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Wrong password or missing staff access.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RoomkeysError {
    /// Classify this error.
    ///
    /// Callers map `AccessDenied` to a generic "incorrect password or
    /// passcode" response and everything else to an internal error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomkeysError::Core(e) => e.kind(),
            RoomkeysError::Kms(e) => e.kind(),
            RoomkeysError::Permission(e) => e.kind(),
            RoomkeysError::Store(_) => ErrorKind::Provider,
            RoomkeysError::AccessDenied(_) => ErrorKind::AccessDenied,
            RoomkeysError::Serialization(_) | RoomkeysError::Config(_) => ErrorKind::Structural,
        }
    }

    /// Whether this should be reported as a bad credential.
    pub fn is_access_denied(&self) -> bool {
        self.kind() == ErrorKind::AccessDenied
    }
}

impl From<RoomkeysError> for PermsError {
    fn from(e: RoomkeysError) -> Self {
        match e {
            RoomkeysError::Core(e) => PermsError::Core(e),
            RoomkeysError::Kms(e) => PermsError::Kms(e),
            RoomkeysError::Permission(e) => e,
            RoomkeysError::Store(e) => e.into(),
            RoomkeysError::AccessDenied(m) => PermsError::AccessDenied(m),
            RoomkeysError::Serialization(m) | RoomkeysError::Config(m) => {
                PermsError::Serialization(m)
            }
        }
    }
}

/// Result type for Roomkeys operations.
pub type Result<T> = std::result::Result<T, RoomkeysError>;
