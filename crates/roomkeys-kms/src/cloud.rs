//! KMS backed by an external key service.
//!
//! The service itself sits behind [`KmsProvider`] so that the transport can
//! be swapped (or faked in tests). Each request is bounded by a timeout and
//! never retried here.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roomkeys_core::{KeyType, ManagedKey};
use tracing::{debug, warn};

use crate::error::{KmsError, Result};
use crate::kms::Kms;

/// Encryption context sent with every provider request.
pub type EncryptionContext = BTreeMap<String, String>;

/// Error code a provider returns for ciphertext it cannot decrypt.
pub const INVALID_CIPHERTEXT: &str = "InvalidCiphertextException";

/// Error code a provider returns when the caller lacks permission.
pub const ACCESS_DENIED: &str = "AccessDeniedException";

/// Failure reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ProviderError> for KmsError {
    fn from(e: ProviderError) -> Self {
        match e.code.as_str() {
            INVALID_CIPHERTEXT => KmsError::InvalidKey,
            ACCESS_DENIED => KmsError::AccessDenied(e.message),
            _ => KmsError::Provider {
                code: e.code,
                message: e.message,
            },
        }
    }
}

/// Transport to an external key service.
#[async_trait]
pub trait KmsProvider: Send + Sync {
    /// Fetch `num_bytes` random bytes.
    async fn generate_random(&self, num_bytes: usize) -> std::result::Result<Vec<u8>, ProviderError>;

    /// Create a data key under `key_id` and return only its ciphertext.
    async fn generate_data_key_without_plaintext(
        &self,
        key_id: &str,
        key_type: KeyType,
        context: &EncryptionContext,
    ) -> std::result::Result<Vec<u8>, ProviderError>;

    /// Decrypt a data key. The context must match the one used to create it.
    async fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &EncryptionContext,
    ) -> std::result::Result<Vec<u8>, ProviderError>;

    /// Region this transport talks to, if it is pinned to one.
    fn region(&self) -> Option<&str> {
        None
    }
}

/// A KMS that delegates to a [`KmsProvider`].
#[derive(Clone)]
pub struct CloudKms {
    provider: Arc<dyn KmsProvider>,
    key_id: String,
    region: Option<String>,
    endpoint: Option<String>,
    timeout: Duration,
}

impl CloudKms {
    pub fn new(provider: Arc<dyn KmsProvider>, key_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            key_id: key_id.into(),
            region: None,
            endpoint: None,
            timeout,
        }
    }

    /// Record where the master key lives.
    pub fn with_location(mut self, region: impl Into<String>, endpoint: Option<String>) -> Self {
        self.region = Some(region.into());
        self.endpoint = endpoint;
        self
    }

    /// The master key identifier at the provider.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    async fn call<T, F>(&self, op: &'static str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ProviderError>> + Send,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(op, code = %e.code, "kms provider request failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(op, timeout = ?self.timeout, "kms provider request timed out");
                Err(KmsError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for CloudKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudKms")
            .field("key_id", &self.key_id)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn context_of(context_key: &str, context_value: &str) -> EncryptionContext {
    let mut context = EncryptionContext::new();
    context.insert(context_key.to_string(), context_value.to_string());
    context
}

#[async_trait]
impl Kms for CloudKms {
    async fn generate_nonce(&self, size: usize) -> Result<Vec<u8>> {
        let bytes = self
            .call("generate_random", self.provider.generate_random(size))
            .await?;
        if bytes.len() != size {
            return Err(KmsError::Provider {
                code: "ShortRandom".to_string(),
                message: format!("asked for {} bytes, got {}", size, bytes.len()),
            });
        }
        Ok(bytes)
    }

    async fn generate_encrypted_key(
        &self,
        key_type: KeyType,
        context_key: &str,
        context_value: &str,
    ) -> Result<ManagedKey> {
        let context = context_of(context_key, context_value);
        let blob = self
            .call(
                "generate_data_key",
                self.provider
                    .generate_data_key_without_plaintext(&self.key_id, key_type, &context),
            )
            .await?;
        debug!(%key_type, context_key, key_id = %self.key_id, "cloud kms generated key");
        Ok(ManagedKey::from_ciphertext(key_type, Vec::new(), blob)
            .with_context(context_key, context_value))
    }

    async fn decrypt_key(&self, key: &ManagedKey) -> Result<ManagedKey> {
        let ciphertext = key.require_ciphertext()?;
        let context = context_of(&key.context_key, &key.context_value);
        let plaintext = self
            .call("decrypt", self.provider.decrypt(ciphertext, &context))
            .await?;
        Ok(key.clone().with_plaintext(plaintext)?)
    }
}
