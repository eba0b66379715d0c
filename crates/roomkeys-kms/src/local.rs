//! Local KMS backed by an in-process master key.
//!
//! Blob layout for a key of `n` bytes:
//!
//! ```text
//! HMAC-SHA256(key, context_key || context_value)   32 bytes
//! AES-CBC(master, iv, key)                          n bytes
//! ```
//!
//! where `iv` is the first 16 bytes of SHA-256(context_key || context_value).
//! This is a development construction, not a hardened one.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use roomkeys_core::{block_crypt, CryptMode, KeyType, ManagedKey, BLOCK_SIZE};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{KmsError, Result};
use crate::kms::Kms;

type HmacSha256 = Hmac<Sha256>;

/// Length of the MAC prefix on a local KMS blob.
pub const MAC_SIZE: usize = 32;

/// Required master key length in bytes (AES-256).
pub const MASTER_KEY_SIZE: usize = 32;

/// A KMS that wraps keys under a locally held AES-256 master key.
#[derive(Clone)]
pub struct LocalKms {
    master: Option<ManagedKey>,
}

impl LocalKms {
    /// Create a local KMS with the given 32-byte master key.
    pub fn new(master_key: &[u8]) -> Result<Self> {
        let master = ManagedKey::from_plaintext(KeyType::Aes256, master_key.to_vec())?;
        Ok(Self {
            master: Some(master),
        })
    }

    /// A KMS with no master key. Every operation fails with `Unavailable`.
    pub fn unconfigured() -> Self {
        Self { master: None }
    }

    /// Whether a master key is present.
    pub fn is_configured(&self) -> bool {
        self.master.is_some()
    }

    fn master_key(&self) -> Result<&[u8]> {
        let master = self.master.as_ref().ok_or(KmsError::Unavailable)?;
        Ok(master.require_plaintext()?)
    }

    /// Wrap a decrypted key under the master key, bound to a context.
    pub fn wrap_key(
        &self,
        key: &ManagedKey,
        context_key: &str,
        context_value: &str,
    ) -> Result<ManagedKey> {
        let master = self.master_key()?;
        let plaintext = key.require_plaintext()?;
        let iv = context_iv(context_key, context_value);

        let mut blob = context_mac(plaintext, context_key, context_value)?;
        let mut body = plaintext.to_vec();
        block_crypt(&iv, master, &mut body, CryptMode::Encrypt)?;
        blob.extend_from_slice(&body);

        Ok(
            ManagedKey::from_ciphertext(key.key_type, iv.to_vec(), blob)
                .with_context(context_key, context_value),
        )
    }

    /// Unwrap a key produced by [`LocalKms::wrap_key`].
    pub fn unwrap_key(&self, key: &ManagedKey) -> Result<ManagedKey> {
        let master = self.master_key()?;
        let blob = key.require_ciphertext()?;
        if blob.len() != MAC_SIZE + key.key_type.key_size() {
            warn!(len = blob.len(), "local kms blob has wrong length");
            return Err(KmsError::InvalidKey);
        }

        let (expected_mac, body) = blob.split_at(MAC_SIZE);
        let iv = context_iv(&key.context_key, &key.context_value);
        let mut plaintext = Zeroizing::new(body.to_vec());
        block_crypt(&iv, master, &mut plaintext, CryptMode::Decrypt)?;

        let mut mac = <HmacSha256 as Mac>::new_from_slice(&plaintext)
            .map_err(|_| KmsError::InvalidKey)?;
        mac.update(key.context_key.as_bytes());
        mac.update(key.context_value.as_bytes());
        if mac.verify_slice(expected_mac).is_err() {
            warn!(
                context_key = %key.context_key,
                "local kms rejected key: context mac mismatch"
            );
            return Err(KmsError::InvalidKey);
        }

        Ok(key.clone().with_plaintext(plaintext.to_vec())?)
    }
}

impl Default for LocalKms {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl std::fmt::Debug for LocalKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKms")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[async_trait]
impl Kms for LocalKms {
    async fn generate_nonce(&self, size: usize) -> Result<Vec<u8>> {
        self.master_key()?;
        random_bytes(size)
    }

    async fn generate_encrypted_key(
        &self,
        key_type: KeyType,
        context_key: &str,
        context_value: &str,
    ) -> Result<ManagedKey> {
        self.master_key()?;
        let bytes = Zeroizing::new(random_bytes(key_type.key_size())?);
        let key = ManagedKey::from_plaintext(key_type, bytes.to_vec())?;
        let wrapped = self.wrap_key(&key, context_key, context_value)?;
        debug!(%key_type, context_key, "local kms generated key");
        Ok(wrapped)
    }

    async fn decrypt_key(&self, key: &ManagedKey) -> Result<ManagedKey> {
        self.unwrap_key(key)
    }
}

/// First block of SHA-256 over the concatenated context.
pub fn context_iv(context_key: &str, context_value: &str) -> [u8; BLOCK_SIZE] {
    let digest = Sha256::new()
        .chain_update(context_key.as_bytes())
        .chain_update(context_value.as_bytes())
        .finalize();
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(&digest[..BLOCK_SIZE]);
    iv
}

fn context_mac(key: &[u8], context_key: &str, context_value: &str) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| KmsError::InvalidKey)?;
    mac.update(context_key.as_bytes());
    mac.update(context_value.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub(crate) fn random_bytes(size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| KmsError::Random(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomkeys_core::ErrorKind;
    use std::sync::Arc;

    fn zero_kms() -> LocalKms {
        LocalKms::new(&[0u8; 32]).unwrap()
    }

    #[tokio::test]
    async fn test_generate_and_decrypt_roundtrip() {
        let kms = zero_kms();
        for key_type in [KeyType::Aes128, KeyType::Aes256] {
            let key = kms
                .generate_encrypted_key(key_type, "room", "R1")
                .await
                .unwrap();
            assert!(key.is_encrypted());
            assert_eq!(key.context_key, "room");
            assert_eq!(key.context_value, "R1");
            assert_eq!(
                key.ciphertext().unwrap().len(),
                MAC_SIZE + key_type.key_size()
            );

            let plain = kms.decrypt_key(&key).await.unwrap();
            assert_eq!(plain.plaintext().unwrap().len(), key_type.key_size());
        }
    }

    #[tokio::test]
    async fn test_context_mismatch_is_invalid_key() {
        let kms = zero_kms();
        let mut key = kms
            .generate_encrypted_key(KeyType::Aes128, "room", "R1")
            .await
            .unwrap();
        key.context_value = "R2".to_string();

        let err = kms.decrypt_key(&key).await.unwrap_err();
        assert!(matches!(err, KmsError::InvalidKey));
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_wrong_master_is_invalid_key() {
        let key = zero_kms()
            .generate_encrypted_key(KeyType::Aes256, "room", "R1")
            .await
            .unwrap();
        let other = LocalKms::new(&[9u8; 32]).unwrap();
        assert!(matches!(
            other.decrypt_key(&key).await,
            Err(KmsError::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn test_decrypt_plaintext_is_state_error() {
        let kms = zero_kms();
        let key = ManagedKey::generate(KeyType::Aes128);
        let err = kms.decrypt_key(&key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[tokio::test]
    async fn test_unconfigured_fails_everything() {
        let kms = LocalKms::unconfigured();
        assert!(matches!(
            kms.generate_nonce(8).await,
            Err(KmsError::Unavailable)
        ));
        assert!(matches!(
            kms.generate_encrypted_key(KeyType::Aes128, "a", "b").await,
            Err(KmsError::Unavailable)
        ));

        let key = zero_kms()
            .generate_encrypted_key(KeyType::Aes128, "a", "b")
            .await
            .unwrap();
        let err = kms.decrypt_key(&key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_new_rejects_short_master() {
        let err = LocalKms::new(&[0u8; 16]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[tokio::test]
    async fn test_generate_nonce_length() {
        let kms = zero_kms();
        assert_eq!(kms.generate_nonce(56).await.unwrap().len(), 56);
        assert!(kms.generate_nonce(0).await.unwrap().is_empty());
    }

    #[test]
    fn test_known_blob() {
        let kms = zero_kms();
        let key = ManagedKey::from_plaintext(KeyType::Aes128, vec![0x01; 16]).unwrap();
        let wrapped = kms.wrap_key(&key, "room", "R1").unwrap();

        assert_eq!(hex::encode(&wrapped.iv), "554b345df2d0cab432693df27cce96ab");
        assert_eq!(
            hex::encode(wrapped.ciphertext().unwrap()),
            "75ca4472fb9adcaea2f55bcd6dc9edc2a221ca14ae810112b6773096786443f8\
             7e29491cfce06c7ec0eb1e0e8302bebb"
        );
        assert_eq!(
            kms.unwrap_key(&wrapped).unwrap().plaintext().unwrap(),
            &[0x01; 16]
        );
    }

    #[tokio::test]
    async fn test_concurrent_use() {
        let kms: Arc<dyn Kms> = Arc::new(zero_kms());
        let mut handles = Vec::new();
        for i in 0..8 {
            let kms = Arc::clone(&kms);
            handles.push(tokio::spawn(async move {
                let value = format!("R{}", i);
                let key = kms
                    .generate_encrypted_key(KeyType::Aes256, "room", &value)
                    .await
                    .unwrap();
                kms.decrypt_key(&key).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(!handle.await.unwrap().is_encrypted());
        }
    }
}
