//! The protected secret that capabilities unlock.

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use roomkeys_core::{
    CoreError, KeyPairType, KeyType, ManagedKey, ManagedKeyPair, SubjectNonce, BLOCK_SIZE,
    NONCE_SIZE,
};
use roomkeys_kms::Kms;

use crate::error::{PermsError, Result};

const SEED_SIZE: usize = 32;
const PAYLOAD_KEY_SIZE: usize = 32;

/// A protected key pair plus payload key, bound to a nonce.
///
/// The key-encrypting key is held by the KMS. The key pair is stored
/// encrypted under it with IV = nonce[..16]; the payload key carries its
/// own random IV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSubject {
    pub nonce: SubjectNonce,
    pub key_encrypting_key: ManagedKey,
    pub key_pair: ManagedKeyPair,
    pub payload_key: ManagedKey,
    pub public_payload: Vec<u8>,
}

impl GrantSubject {
    /// Create a subject whose KEK is bound to `(context_key, context_value)`.
    pub async fn generate(
        kms: &dyn Kms,
        context_key: &str,
        context_value: &str,
        public_payload: Vec<u8>,
    ) -> Result<Self> {
        let random = Zeroizing::new(
            kms.generate_nonce(NONCE_SIZE + SEED_SIZE + PAYLOAD_KEY_SIZE + BLOCK_SIZE)
                .await?,
        );
        let (nonce, rest) = random.split_at(NONCE_SIZE);
        let (seed, rest) = rest.split_at(SEED_SIZE);
        let (payload_key, payload_iv) = rest.split_at(PAYLOAD_KEY_SIZE);
        let nonce = SubjectNonce::from_slice(nonce)?;

        let key_encrypting_key = kms
            .generate_encrypted_key(KeyType::Aes256, context_key, context_value)
            .await?;
        let kek = kms.decrypt_key(&key_encrypting_key).await?;

        let key_pair = KeyPairType::Curve25519
            .generate_from(seed)?
            .with_iv(nonce.iv())
            .encrypt(&kek)?;
        let payload_key = ManagedKey::from_plaintext(KeyType::Aes256, payload_key.to_vec())?
            .with_iv(payload_iv)
            .encrypt(&kek)?;

        debug!(context_key, context_value, "generated grant subject");
        Ok(Self {
            nonce,
            key_encrypting_key,
            key_pair,
            payload_key,
            public_payload,
        })
    }

    /// Replace every key and the nonce, keeping the KMS context and public
    /// payload. Capabilities issued before this call no longer resolve.
    pub async fn regenerate(&mut self, kms: &dyn Kms) -> Result<()> {
        let fresh = Self::generate(
            kms,
            &self.key_encrypting_key.context_key,
            &self.key_encrypting_key.context_value,
            self.public_payload.clone(),
        )
        .await?;
        *self = fresh;
        Ok(())
    }

    /// Decrypt the subject secret through the KMS.
    pub async fn unlock_with_kms(&self, kms: &dyn Kms) -> Result<SubjectSecret> {
        let kek = kms.decrypt_key(&self.key_encrypting_key).await?;
        let key_pair = self.key_pair.decrypt(&kek)?;
        let payload_key = self.payload_key.decrypt(&kek)?;
        SubjectSecret::from_keys(&key_pair, &payload_key)
    }

    /// Rebuild the decrypted key pair from a recovered secret, checking it
    /// against the stored public key.
    pub fn restore_key_pair(&self, secret: &SubjectSecret) -> Result<ManagedKeyPair> {
        let key_pair = self
            .key_pair
            .key_pair_type
            .generate_from(&secret.private_key)?
            .with_iv(self.nonce.iv());
        if key_pair.public_key != self.key_pair.public_key {
            return Err(CoreError::IntegrityFailed.into());
        }
        Ok(key_pair)
    }

    /// Rebuild the decrypted payload key from a recovered secret.
    pub fn restore_payload_key(&self, secret: &SubjectSecret) -> Result<ManagedKey> {
        Ok(
            ManagedKey::from_plaintext(self.payload_key.key_type, secret.payload_key.clone())?
                .with_iv(self.payload_key.iv.clone()),
        )
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

/// The private payload carried by every grant capability.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSecret {
    pub private_key: Vec<u8>,
    pub payload_key: Vec<u8>,
}

impl SubjectSecret {
    /// Collect the secret from decrypted subject keys.
    pub fn from_keys(key_pair: &ManagedKeyPair, payload_key: &ManagedKey) -> Result<Self> {
        Ok(Self {
            private_key: key_pair.require_private_key()?.to_vec(),
            payload_key: payload_key.require_plaintext()?.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut buf = Zeroizing::new(Vec::new());
        ciborium::into_writer(self, &mut *buf)
            .map_err(|e| PermsError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::Serialization(e.to_string()))
    }
}

impl Drop for SubjectSecret {
    fn drop(&mut self) {
        self.private_key.zeroize();
        self.payload_key.zeroize();
    }
}

impl std::fmt::Debug for SubjectSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubjectSecret(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomkeys_kms::LocalKms;

    #[tokio::test]
    async fn test_generate_stores_everything_encrypted() {
        let kms = LocalKms::new(&[0u8; 32]).unwrap();
        let subject = GrantSubject::generate(&kms, "room", "R1", b"lobby".to_vec())
            .await
            .unwrap();

        assert!(subject.key_encrypting_key.is_encrypted());
        assert!(subject.key_pair.is_encrypted());
        assert!(subject.payload_key.is_encrypted());
        assert_eq!(subject.key_encrypting_key.context_value, "R1");
        assert_eq!(subject.key_pair.iv, subject.nonce.iv());
        assert_eq!(subject.payload_key.iv.len(), BLOCK_SIZE);
        assert_ne!(subject.payload_key.iv, subject.key_pair.iv);

        let bytes = subject.to_bytes().unwrap();
        let restored = GrantSubject::from_bytes(&bytes).unwrap();
        assert_eq!(restored.nonce, subject.nonce);
        assert_eq!(restored.public_payload, b"lobby");
    }

    #[tokio::test]
    async fn test_unlock_with_kms_restores_keys() {
        let kms = LocalKms::new(&[0u8; 32]).unwrap();
        let subject = GrantSubject::generate(&kms, "room", "R1", vec![])
            .await
            .unwrap();

        let secret = subject.unlock_with_kms(&kms).await.unwrap();
        let key_pair = subject.restore_key_pair(&secret).unwrap();
        assert_eq!(key_pair.public_key, subject.key_pair.public_key);

        let payload_key = subject.restore_payload_key(&secret).unwrap();
        assert_eq!(payload_key.plaintext().unwrap().len(), 32);
        assert_eq!(payload_key.iv, subject.payload_key.iv);
    }

    #[tokio::test]
    async fn test_restore_rejects_foreign_secret() {
        let kms = LocalKms::new(&[0u8; 32]).unwrap();
        let subject = GrantSubject::generate(&kms, "room", "R1", vec![])
            .await
            .unwrap();
        let secret = SubjectSecret {
            private_key: vec![5u8; 32],
            payload_key: vec![0u8; 32],
        };
        assert!(subject.restore_key_pair(&secret).is_err());
    }

    #[tokio::test]
    async fn test_regenerate_changes_nonce_and_keys() {
        let kms = LocalKms::new(&[0u8; 32]).unwrap();
        let mut subject = GrantSubject::generate(&kms, "room", "R1", b"p".to_vec())
            .await
            .unwrap();
        let old_nonce = subject.nonce;
        let old_public = subject.key_pair.public_key.clone();

        subject.regenerate(&kms).await.unwrap();
        assert_ne!(subject.nonce, old_nonce);
        assert_ne!(subject.payload_key.iv, subject.key_pair.iv);
        assert_ne!(subject.key_pair.public_key, old_public);
        assert_eq!(subject.key_encrypting_key.context_value, "R1");
        assert_eq!(subject.public_payload, b"p");
    }

    #[test]
    fn test_secret_cbor_roundtrip() {
        let secret = SubjectSecret {
            private_key: vec![1; 32],
            payload_key: vec![2; 32],
        };
        let bytes = secret.to_bytes().unwrap();
        assert_eq!(SubjectSecret::from_bytes(&bytes).unwrap(), secret);
    }
}
