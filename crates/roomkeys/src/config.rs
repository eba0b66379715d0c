//! Top-level configuration.

use serde::{Deserialize, Serialize};

use roomkeys_core::KdfParams;
use roomkeys_kms::KmsConfig;

use crate::error::{Result, RoomkeysError};

/// Password stretching and KMS selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2id parameters for client keys and passcodes.
    pub kdf: KdfParams,

    /// Which KMS backs system keys.
    pub kms: KmsConfig,
}

impl SecurityConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RoomkeysError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RoomkeysError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomkeys_kms::KmsCredential;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SecurityConfig::from_json("{}").unwrap(), SecurityConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config = SecurityConfig::from_json(
            r#"{ "kdf": { "memory_kib": 64 }, "kms": { "request_timeout_ms": 250 } }"#,
        )
        .unwrap();
        assert_eq!(config.kdf.memory_kib, 64);
        assert_eq!(config.kdf.iterations, KdfParams::default().iterations);
        assert_eq!(config.kms.request_timeout_ms, 250);
        assert!(config.kms.credential.is_none());
    }

    #[test]
    fn test_json_roundtrip_with_credential() {
        let config = SecurityConfig {
            kms: KmsConfig {
                credential: Some(KmsCredential::local(&[9u8; 32])),
                ..KmsConfig::default()
            },
            ..SecurityConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(SecurityConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(
            SecurityConfig::from_json("{ not json"),
            Err(RoomkeysError::Config(_))
        ));
    }
}
