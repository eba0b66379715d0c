//! Error types for Roomkeys core primitives.

use thiserror::Error;

/// Coarse classification shared by every error in the workspace.
///
/// Session code maps `AccessDenied` to a generic "incorrect passcode or
/// password" response; every other kind is an internal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong-length IV, key or nonce, or data that is not block aligned.
    Structural,
    /// A key is in the wrong encrypted/decrypted state, or is missing its IV.
    State,
    /// A MAC, tag or box failed to verify.
    AccessDenied,
    /// The key management service is not configured.
    Unavailable,
    /// An opaque failure surfaced from an external key provider.
    Provider,
}

/// Errors raised by key primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("data length {0} is not a multiple of the block size")]
    NotBlockAligned(usize),

    #[error("key must be {expected} but is {actual}")]
    KeyState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("key has no IV")]
    MissingIv,

    #[error("unknown key type: {0}")]
    UnknownKeyType(String),

    #[error("access denied")]
    AccessDenied,

    #[error("message integrity failed")]
    IntegrityFailed,

    #[error("message corrupted")]
    MessageCorrupted,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("randomness source failed: {0}")]
    Random(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidLength { .. }
            | CoreError::NotBlockAligned(_)
            | CoreError::UnknownKeyType(_)
            | CoreError::KeyDerivation(_)
            | CoreError::Encoding(_)
            | CoreError::Decoding(_) => ErrorKind::Structural,
            CoreError::KeyState { .. } | CoreError::MissingIv => ErrorKind::State,
            CoreError::Random(_) => ErrorKind::Unavailable,
            CoreError::AccessDenied
            | CoreError::IntegrityFailed
            | CoreError::MessageCorrupted => ErrorKind::AccessDenied,
        }
    }

    pub(crate) fn expected_decrypted() -> Self {
        CoreError::KeyState {
            expected: "decrypted",
            actual: "encrypted",
        }
    }

    pub(crate) fn expected_encrypted() -> Self {
        CoreError::KeyState {
            expected: "encrypted",
            actual: "decrypted",
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
