//! The KMS trait: the abstract interface for envelope encryption.
//!
//! Implementations include a local master-key KMS (tests and development)
//! and a provider-backed KMS for an external key service.

use async_trait::async_trait;
use roomkeys_core::{KeyType, ManagedKey};

use crate::error::Result;

/// Context name under which per-subject keys are bound to their nonce.
pub const NONCE_CONTEXT: &str = "nonce";

/// Envelope encryption against a master secret.
///
/// Implementations are shared as `Arc<dyn Kms>` and must tolerate
/// concurrent calls.
#[async_trait]
pub trait Kms: Send + Sync {
    /// Return exactly `size` random bytes.
    async fn generate_nonce(&self, size: usize) -> Result<Vec<u8>>;

    /// Create a fresh key of `key_type`, returned in encrypted form only.
    ///
    /// The context pair is recorded on the key and must match on decrypt.
    async fn generate_encrypted_key(
        &self,
        key_type: KeyType,
        context_key: &str,
        context_value: &str,
    ) -> Result<ManagedKey>;

    /// Decrypt a key produced by [`Kms::generate_encrypted_key`].
    ///
    /// Fails with a state error if `key` is already decrypted, and with
    /// `InvalidKey` if its context was altered.
    async fn decrypt_key(&self, key: &ManagedKey) -> Result<ManagedKey>;
}
