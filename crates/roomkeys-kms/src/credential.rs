//! Serializable KMS descriptions and the connector that revives them.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cloud::{CloudKms, KmsProvider};
use crate::config::KmsConfig;
use crate::error::{KmsError, Result};
use crate::kms::Kms;
use crate::local::LocalKms;

/// Everything needed to reach a KMS, as JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum KmsCredential {
    /// Local master key, hex encoded.
    Local { master_key: String },
    /// Key held by an external provider.
    Cloud {
        key_id: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
}

impl KmsCredential {
    /// A local credential for the given master key bytes.
    pub fn local(master_key: &[u8]) -> Self {
        KmsCredential::Local {
            master_key: hex::encode(master_key),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| KmsError::Credential(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| KmsError::Credential(e.to_string()))
    }

    /// Backend name for logs.
    pub fn backend(&self) -> &'static str {
        match self {
            KmsCredential::Local { .. } => "local",
            KmsCredential::Cloud { .. } => "cloud",
        }
    }
}

impl std::fmt::Debug for KmsCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KmsCredential::Local { .. } => f
                .debug_struct("Local")
                .field("master_key", &"<redacted>")
                .finish(),
            KmsCredential::Cloud {
                key_id,
                region,
                endpoint,
            } => f
                .debug_struct("Cloud")
                .field("key_id", key_id)
                .field("region", region)
                .field("endpoint", endpoint)
                .finish(),
        }
    }
}

/// Turns credentials into live KMS handles.
#[derive(Clone)]
pub struct KmsConnector {
    provider: Option<Arc<dyn KmsProvider>>,
    request_timeout: Duration,
}

impl KmsConnector {
    /// A connector that can only build local KMS handles.
    pub fn new() -> Self {
        Self {
            provider: None,
            request_timeout: KmsConfig::default().request_timeout(),
        }
    }

    /// A connector configured from `config`.
    pub fn from_config(config: &KmsConfig) -> Self {
        Self {
            provider: None,
            request_timeout: config.request_timeout(),
        }
    }

    /// Register the provider used for cloud credentials.
    pub fn with_provider(mut self, provider: Arc<dyn KmsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build a KMS for `credential`.
    pub fn connect(&self, credential: &KmsCredential) -> Result<Arc<dyn Kms>> {
        debug!(backend = credential.backend(), "connecting kms");
        match credential {
            KmsCredential::Local { master_key } => {
                let bytes = zeroize::Zeroizing::new(
                    hex::decode(master_key).map_err(|e| KmsError::Credential(e.to_string()))?,
                );
                Ok(Arc::new(LocalKms::new(&bytes)?))
            }
            KmsCredential::Cloud {
                key_id,
                region,
                endpoint,
            } => {
                let provider = self.provider.clone().ok_or(KmsError::Unavailable)?;
                if let Some(served) = provider.region() {
                    if served != region {
                        return Err(KmsError::Credential(format!(
                            "provider serves region {served}, credential names {region}"
                        )));
                    }
                }
                Ok(Arc::new(self.cloud(provider, key_id, region, endpoint.clone())))
            }
        }
    }

    fn cloud(
        &self,
        provider: Arc<dyn KmsProvider>,
        key_id: &str,
        region: &str,
        endpoint: Option<String>,
    ) -> CloudKms {
        CloudKms::new(provider, key_id, self.request_timeout).with_location(region, endpoint)
    }

    /// Build the KMS named by `config`, or an unconfigured one if none is set.
    pub fn connect_configured(&self, config: &KmsConfig) -> Result<Arc<dyn Kms>> {
        match &config.credential {
            Some(credential) => self.connect(credential),
            None => Ok(Arc::new(LocalKms::unconfigured())),
        }
    }
}

impl Default for KmsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KmsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsConnector")
            .field("has_provider", &self.has_provider())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
