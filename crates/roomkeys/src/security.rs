//! Per-account key security.
//!
//! An account's key pair is encrypted under a key-encrypting key (KEK).
//! The KEK is stored twice: once wrapped by the KMS (the system key, used
//! for password resets) and once encrypted under a password-derived client
//! key (the user key, used for normal unlocks). A MAC over the nonce keyed
//! by the client key lets a wrong password be rejected before any
//! decryption is attempted.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use roomkeys_core::{
    derive_key, KdfParams, KeyPairType, KeyType, ManagedKey, ManagedKeyPair, SubjectNonce,
    NONCE_SIZE,
};
use roomkeys_kms::{Kms, NONCE_CONTEXT};

use crate::error::{Result, RoomkeysError};

type HmacSha256 = Hmac<Sha256>;

const SEED_SIZE: usize = 32;

/// The per-account secret bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSecurity {
    /// Salt for the client key and IV source for the KEK copies.
    pub nonce: SubjectNonce,

    /// HMAC-SHA256 of the nonce keyed by the client key.
    pub mac: Vec<u8>,

    /// KEK wrapped by the KMS.
    pub system_key: ManagedKey,

    /// KEK encrypted under the client key.
    pub user_key: ManagedKey,

    /// Account key pair, private half encrypted under the KEK.
    pub key_pair: ManagedKeyPair,

    /// Parameters used to derive the client key.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl AccountSecurity {
    /// Create the bundle for a new account.
    pub async fn new(kms: &dyn Kms, password: &str, kdf: &KdfParams) -> Result<Self> {
        let random = Zeroizing::new(kms.generate_nonce(NONCE_SIZE + SEED_SIZE).await?);
        let (nonce, seed) = random.split_at(NONCE_SIZE);
        let nonce = SubjectNonce::from_slice(nonce)?;

        let system_key = kms
            .generate_encrypted_key(KeyType::Aes256, NONCE_CONTEXT, &nonce.to_hex())
            .await?;
        let kek = kms.decrypt_key(&system_key).await?.with_iv(nonce.iv());

        let key_pair = KeyPairType::Curve25519
            .generate_from(seed)?
            .with_iv(nonce.iv())
            .encrypt(&kek)?;

        let client_key = derive_key(password.as_bytes(), nonce.as_bytes(), KeyType::Aes256, kdf)?;
        let user_key = kek.encrypt(&client_key)?;
        let mac = nonce_mac(&client_key, &nonce)?;

        debug!(nonce = ?nonce, "created account security");
        Ok(Self {
            nonce,
            mac,
            system_key,
            user_key,
            key_pair,
            kdf: *kdf,
        })
    }

    /// The account's public key.
    pub fn public_key(&self) -> &[u8] {
        &self.key_pair.public_key
    }

    /// Derive the client key for `password`.
    pub fn client_key(&self, password: &str) -> Result<ManagedKey> {
        Ok(derive_key(
            password.as_bytes(),
            self.nonce.as_bytes(),
            KeyType::Aes256,
            &self.kdf,
        )?)
    }

    /// Check `client_key` against the stored MAC.
    pub fn verify(&self, client_key: &ManagedKey) -> Result<()> {
        let mut mac = new_mac(client_key)?;
        mac.update(self.nonce.as_bytes());
        mac.verify_slice(&self.mac).map_err(|_| {
            warn!("account unlock rejected: mac mismatch");
            RoomkeysError::AccessDenied("incorrect password".to_string())
        })
    }

    /// Decrypt the KEK with a verified client key.
    pub fn unlock_key(&self, client_key: &ManagedKey) -> Result<ManagedKey> {
        self.verify(client_key)?;
        Ok(self.user_key.decrypt(client_key)?)
    }

    /// Decrypt the account key pair.
    ///
    /// Verifies the MAC first; a wrong client key fails with `AccessDenied`
    /// without attempting decryption.
    pub fn unlock(&self, client_key: &ManagedKey) -> Result<ManagedKeyPair> {
        let kek = self.unlock_key(client_key)?;
        Ok(self.key_pair.decrypt(&kek)?)
    }

    /// Set a new password without knowing the old one, via the KMS.
    ///
    /// The key pair, nonce and public key are unchanged.
    pub async fn reset_password(&mut self, kms: &dyn Kms, new_password: &str) -> Result<()> {
        let kek = kms
            .decrypt_key(&self.system_key)
            .await?
            .with_iv(self.nonce.iv());
        self.rewrap(&kek, new_password)?;
        debug!("reset account password through kms");
        Ok(())
    }

    /// Change the password given the current client key.
    pub fn change_password(&mut self, old_client_key: &ManagedKey, new_password: &str) -> Result<()> {
        let kek = self.unlock_key(old_client_key)?;
        self.rewrap(&kek, new_password)
    }

    fn rewrap(&mut self, kek: &ManagedKey, new_password: &str) -> Result<()> {
        let client_key = self.client_key(new_password)?;
        let user_key = kek.encrypt(&client_key)?;
        let mac = nonce_mac(&client_key, &self.nonce)?;
        self.user_key = user_key;
        self.mac = mac;
        Ok(())
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| RoomkeysError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| RoomkeysError::Serialization(e.to_string()))
    }
}

fn new_mac(client_key: &ManagedKey) -> Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(client_key.require_plaintext()?)
        .map_err(|e| RoomkeysError::AccessDenied(e.to_string()))
}

fn nonce_mac(client_key: &ManagedKey, nonce: &SubjectNonce) -> Result<Vec<u8>> {
    let mut mac = new_mac(client_key)?;
    mac.update(nonce.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
