//! Strong type definitions for Roomkeys identifiers.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::BLOCK_SIZE;
use crate::error::{CoreError, Result};

/// Length of a subject nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// 24 random bytes bound to a protected secret.
///
/// Every capability identifier is derived from the subject nonce, so a new
/// nonce orphans every capability issued under the old one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectNonce(pub [u8; NONCE_SIZE]);

impl SubjectNonce {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| CoreError::InvalidLength {
            what: "nonce",
            expected: NONCE_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Generate a random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }

    /// The leading block of the nonce, used as a CBC IV.
    pub fn iv(&self) -> &[u8] {
        &self.0[..BLOCK_SIZE]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::Decoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for SubjectNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubjectNonce({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for SubjectNonce {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; NONCE_SIZE]> for SubjectNonce {
    fn from(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }
}

/// A capability identifier: hex of a deterministic ciphertext.
///
/// Always lowercase hex, including when deserialized.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityId(String);

impl CapabilityId {
    /// Build from the raw identifier bytes.
    pub fn from_raw(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse a hex identifier.
    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s).map_err(|e| CoreError::Decoding(e.to_string()))?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to raw bytes.
    pub fn to_raw(&self) -> Vec<u8> {
        // Constructors only admit valid hex.
        hex::decode(&self.0).unwrap_or_default()
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for CapabilityId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

impl From<CapabilityId> for String {
    fn from(id: CapabilityId) -> Self {
        id.0
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.short())
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_hex_roundtrip() {
        let nonce = SubjectNonce::from_bytes([0xAB; NONCE_SIZE]);
        let hex = nonce.to_hex();
        assert_eq!(hex.len(), 48);
        assert_eq!(SubjectNonce::from_hex(&hex).unwrap(), nonce);
    }

    #[test]
    fn test_nonce_from_slice_checks_length() {
        assert!(SubjectNonce::from_slice(&[0u8; 23]).is_err());
        assert!(SubjectNonce::from_slice(&[0u8; 24]).is_ok());
    }

    #[test]
    fn test_nonce_iv_is_leading_block() {
        let mut bytes = [0u8; NONCE_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let nonce = SubjectNonce::from_bytes(bytes);
        assert_eq!(nonce.iv(), &bytes[..16]);
    }

    #[test]
    fn test_capability_id_from_hex() {
        let id = CapabilityId::from_raw(&[1, 2, 3]);
        assert_eq!(id.as_str(), "010203");
        assert_eq!(CapabilityId::from_hex("010203").unwrap(), id);
        assert_eq!(id.to_raw(), vec![1, 2, 3]);
        assert!(CapabilityId::from_hex("zz").is_err());
    }

    #[test]
    fn test_capability_id_deserialize_requires_hex() {
        let id: CapabilityId = serde_json::from_str("\"0A0B\"").unwrap();
        assert_eq!(id.as_str(), "0a0b");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0a0b\"");

        assert!(serde_json::from_str::<CapabilityId>("\"0é\"").is_err());
        assert!(serde_json::from_str::<CapabilityId>("\"not hex\"").is_err());
    }

    #[test]
    fn test_capability_id_short_of_short_id() {
        let id = CapabilityId::from_raw(&[0xAB; 3]);
        assert_eq!(id.short(), "ababab");
        assert_eq!(CapabilityId::from_raw(&[0xAB; 20]).short().len(), 16);
    }

    #[test]
    fn test_capability_id_display_is_full_debug_is_short() {
        let id = CapabilityId::from_raw(&[0xFF; 40]);
        assert_eq!(id.to_string().len(), 80);
        assert!(format!("{:?}", id).len() < 40);
    }
}
