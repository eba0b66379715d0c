//! The closed set of capability kinds.

use serde::{Deserialize, Serialize};

use roomkeys_core::CapabilityId;

use crate::error::{PermsError, Result};
use crate::public_key::PublicKeyCapability;
use crate::shared_secret::SharedSecretCapability;

/// Discriminator for capability storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    PublicKey,
    SharedSecret,
}

impl CapabilityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::PublicKey => "public_key",
            CapabilityKind::SharedSecret => "shared_secret",
        }
    }
}

/// A sealed grant: deterministic id, public payload, encrypted private payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    PublicKey(PublicKeyCapability),
    SharedSecret(SharedSecretCapability),
}

impl Capability {
    pub fn id(&self) -> &CapabilityId {
        match self {
            Capability::PublicKey(c) => &c.id,
            Capability::SharedSecret(c) => &c.id,
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::PublicKey(_) => CapabilityKind::PublicKey,
            Capability::SharedSecret(_) => CapabilityKind::SharedSecret,
        }
    }

    pub fn public_payload(&self) -> &[u8] {
        match self {
            Capability::PublicKey(c) => &c.public_payload,
            Capability::SharedSecret(c) => &c.public_payload,
        }
    }

    pub fn encrypted_private_payload(&self) -> &[u8] {
        match self {
            Capability::PublicKey(c) => &c.encrypted_private_payload,
            Capability::SharedSecret(c) => &c.encrypted_private_payload,
        }
    }

    /// Unwrap a public-key capability.
    pub fn into_public_key(self) -> Result<PublicKeyCapability> {
        match self {
            Capability::PublicKey(c) => Ok(c),
            other => Err(PermsError::WrongKind {
                expected: CapabilityKind::PublicKey.as_str(),
                found: other.kind().as_str(),
            }),
        }
    }

    /// Unwrap a shared-secret capability.
    pub fn into_shared_secret(self) -> Result<SharedSecretCapability> {
        match self {
            Capability::SharedSecret(c) => Ok(c),
            other => Err(PermsError::WrongKind {
                expected: CapabilityKind::SharedSecret.as_str(),
                found: other.kind().as_str(),
            }),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::Serialization(e.to_string()))
    }
}

impl From<PublicKeyCapability> for Capability {
    fn from(c: PublicKeyCapability) -> Self {
        Capability::PublicKey(c)
    }
}

impl From<SharedSecretCapability> for Capability {
    fn from(c: SharedSecretCapability) -> Self {
        Capability::SharedSecret(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Capability {
        Capability::SharedSecret(SharedSecretCapability {
            id: CapabilityId::from_raw(&[1, 2, 3, 4]),
            public_payload: b"room".to_vec(),
            encrypted_private_payload: vec![9; 32],
        })
    }

    #[test]
    fn test_capability_serialization() {
        let cap = sample();
        let bytes = cap.to_bytes().unwrap();
        let recovered = Capability::from_bytes(&bytes).unwrap();
        assert_eq!(cap, recovered);
        assert_eq!(recovered.kind(), CapabilityKind::SharedSecret);
    }

    #[test]
    fn test_wrong_kind_is_structural() {
        let err = sample().into_public_key().unwrap_err();
        assert_eq!(err.kind(), roomkeys_core::ErrorKind::Structural);
    }

    #[test]
    fn test_accessors() {
        let cap = sample();
        assert_eq!(cap.id().as_str(), "01020304");
        assert_eq!(cap.public_payload(), b"room");
        assert_eq!(cap.encrypted_private_payload().len(), 32);
    }

    #[test]
    fn test_non_hex_id_rejected() {
        let mut value: ciborium::Value =
            ciborium::from_reader(sample().to_bytes().unwrap().as_slice()).unwrap();
        let ciborium::Value::Map(entries) = &mut value else {
            panic!("capability should encode as a map");
        };
        for (key, field) in entries.iter_mut() {
            if key.as_text() == Some("id") {
                *field = ciborium::Value::Text("aaaaaaaaaaaaaaa\u{e9}\u{e9}".to_string());
            }
        }
        let mut tampered = Vec::new();
        ciborium::into_writer(&value, &mut tampered).unwrap();

        let err = Capability::from_bytes(&tampered).unwrap_err();
        assert!(matches!(err, PermsError::Serialization(_)));
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(Capability::from_bytes(&[0xFF, 0x00, 0x13]).is_err());
    }
}
