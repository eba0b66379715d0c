//! Capabilities opened with a shared passcode.
//!
//! The passcode is stretched with Argon2id (salt = subject nonce) into an
//! AES-256 key. The identifier is the CBC encryption of the padded nonce
//! under that key with IV = nonce[..16]; the private payload is encrypted
//! under the same key with IV = identifier[..16].

use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use roomkeys_core::{
    block_crypt, derive_key, pad, unpad, CapabilityId, CoreError, CryptMode, KdfParams, KeyType,
    ManagedKey, SubjectNonce, BLOCK_SIZE,
};

use crate::error::{PermsError, Result};

/// A capability opened with a passcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSecretCapability {
    pub id: CapabilityId,

    /// Readable by anyone who can fetch the capability.
    pub public_payload: Vec<u8>,

    /// AES-CBC of the padded private payload.
    pub encrypted_private_payload: Vec<u8>,
}

impl SharedSecretCapability {
    /// Stretch `passcode` into the holder key for `nonce`.
    pub fn passcode_key(
        passcode: &str,
        nonce: &SubjectNonce,
        params: &KdfParams,
    ) -> Result<ManagedKey> {
        Ok(derive_key(
            passcode.as_bytes(),
            nonce.as_bytes(),
            KeyType::Aes256,
            params,
        )?)
    }

    /// Compute the identifier for a holder key.
    pub fn compute_id(nonce: &SubjectNonce, holder_key: &ManagedKey) -> Result<CapabilityId> {
        Ok(CapabilityId::from_raw(&id_bytes(nonce, holder_key)?))
    }

    /// Encrypt `private_payload` for whoever knows the passcode behind `holder_key`.
    pub fn new(
        nonce: &SubjectNonce,
        holder_key: &ManagedKey,
        public_payload: Vec<u8>,
        private_payload: &[u8],
    ) -> Result<Self> {
        let raw_id = id_bytes(nonce, holder_key)?;
        let mut data = pad(private_payload, BLOCK_SIZE);
        block_crypt(
            &raw_id[..BLOCK_SIZE],
            holder_key.require_plaintext()?,
            &mut data,
            CryptMode::Encrypt,
        )?;

        Ok(Self {
            id: CapabilityId::from_raw(&raw_id),
            public_payload,
            encrypted_private_payload: data,
        })
    }

    /// Recover the private payload.
    ///
    /// The identifier is recomputed first; a different passcode yields a
    /// different identifier and is rejected before any decryption.
    pub fn open(
        &self,
        nonce: &SubjectNonce,
        holder_key: &ManagedKey,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let raw_id = id_bytes(nonce, holder_key)?;
        if CapabilityId::from_raw(&raw_id) != self.id {
            warn!(capability = self.id.short(), "passcode does not match capability");
            return Err(PermsError::AccessDenied(
                "passcode does not match capability".to_string(),
            ));
        }

        let payload = &self.encrypted_private_payload;
        if payload.is_empty() || payload.len() % BLOCK_SIZE != 0 {
            return Err(CoreError::MessageCorrupted.into());
        }
        let mut data = Zeroizing::new(payload.clone());
        block_crypt(
            &raw_id[..BLOCK_SIZE],
            holder_key.require_plaintext()?,
            &mut data,
            CryptMode::Decrypt,
        )?;
        Ok(Zeroizing::new(unpad(&data, BLOCK_SIZE)?))
    }
}

fn id_bytes(nonce: &SubjectNonce, holder_key: &ManagedKey) -> Result<Vec<u8>> {
    let mut data = pad(nonce.as_bytes(), BLOCK_SIZE);
    block_crypt(
        nonce.iv(),
        holder_key.require_plaintext()?,
        &mut data,
        CryptMode::Encrypt,
    )?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roomkeys_core::ErrorKind;

    fn fast() -> KdfParams {
        KdfParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_id_is_deterministic() {
        let nonce = SubjectNonce::from_bytes([3u8; 24]);
        let k1 = SharedSecretCapability::passcode_key("open sesame", &nonce, &fast()).unwrap();
        let k2 = SharedSecretCapability::passcode_key("open sesame", &nonce, &fast()).unwrap();
        let a = SharedSecretCapability::compute_id(&nonce, &k1).unwrap();
        let b = SharedSecretCapability::compute_id(&nonce, &k2).unwrap();
        assert_eq!(a, b);
        // 24-byte nonce pads to two blocks.
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_open_with_right_passcode() {
        let nonce = SubjectNonce::generate();
        let key = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        let cap =
            SharedSecretCapability::new(&nonce, &key, b"pub".to_vec(), b"room secret").unwrap();
        assert_eq!(cap.encrypted_private_payload.len() % BLOCK_SIZE, 0);

        let again = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        assert_eq!(cap.open(&nonce, &again).unwrap().as_slice(), b"room secret");
    }

    #[test]
    fn test_open_with_wrong_passcode() {
        let nonce = SubjectNonce::generate();
        let key = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        let cap = SharedSecretCapability::new(&nonce, &key, vec![], b"room secret").unwrap();

        let wrong = SharedSecretCapability::passcode_key("4321", &nonce, &fast()).unwrap();
        let err = cap.open(&nonce, &wrong).unwrap_err();
        assert!(matches!(err, PermsError::AccessDenied(_)));
    }

    #[test]
    fn test_corrupted_payload() {
        let nonce = SubjectNonce::generate();
        let key = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        let mut cap = SharedSecretCapability::new(&nonce, &key, vec![], b"room secret").unwrap();

        cap.encrypted_private_payload.pop();
        let err = cap.open(&nonce, &key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert!(matches!(err, PermsError::Core(CoreError::MessageCorrupted)));
    }

    #[test]
    fn test_empty_private_payload() {
        let nonce = SubjectNonce::generate();
        let key = SharedSecretCapability::passcode_key("x", &nonce, &fast()).unwrap();
        let cap = SharedSecretCapability::new(&nonce, &key, vec![], b"").unwrap();
        assert_eq!(cap.encrypted_private_payload.len(), BLOCK_SIZE);
        assert!(cap.open(&nonce, &key).unwrap().is_empty());
    }

    #[test]
    fn test_id_ignores_payloads() {
        let nonce = SubjectNonce::from_bytes([5u8; 24]);
        let key = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        let a = SharedSecretCapability::new(&nonce, &key, b"one".to_vec(), b"first").unwrap();
        let b = SharedSecretCapability::new(&nonce, &key, b"two".to_vec(), b"second secret")
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.encrypted_private_payload, b.encrypted_private_payload);
    }

    #[test]
    fn test_mismatched_id_is_denied() {
        let nonce = SubjectNonce::generate();
        let key = SharedSecretCapability::passcode_key("1234", &nonce, &fast()).unwrap();
        let mut cap = SharedSecretCapability::new(&nonce, &key, vec![], b"room secret").unwrap();

        cap.id = CapabilityId::from_raw(&[0xAB; 3]);
        let err = cap.open(&nonce, &key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    proptest! {
        #[test]
        fn prop_payload_roundtrip(
            nonce in any::<[u8; 24]>(),
            key in any::<[u8; 32]>(),
            private in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let nonce = SubjectNonce::from_bytes(nonce);
            let key = ManagedKey::from_plaintext(KeyType::Aes256, key.to_vec()).unwrap();
            let cap = SharedSecretCapability::new(&nonce, &key, vec![], &private).unwrap();

            prop_assert_eq!(cap.id.clone(), SharedSecretCapability::compute_id(&nonce, &key).unwrap());
            let opened = cap.open(&nonce, &key).unwrap();
            prop_assert_eq!(opened.as_slice(), private.as_slice());
        }
    }
}
