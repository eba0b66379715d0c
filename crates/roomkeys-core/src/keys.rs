//! Managed symmetric keys.
//!
//! A [`ManagedKey`] is always either decrypted (plaintext available) or
//! encrypted (ciphertext only). The two states are variants of
//! [`KeyMaterial`], so "exactly one is set" holds by construction.
//! `encrypt` and `decrypt` return new values and leave the receiver alone.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::block::{self, CryptMode, BLOCK_SIZE};
use crate::error::{CoreError, Result};

/// Supported symmetric key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "aes-128")]
    Aes128,
    #[serde(rename = "aes-256")]
    Aes256,
}

impl KeyType {
    /// Key size in bytes.
    pub const fn key_size(self) -> usize {
        match self {
            KeyType::Aes128 => 16,
            KeyType::Aes256 => 32,
        }
    }

    /// Cipher block size in bytes.
    pub const fn block_size(self) -> usize {
        BLOCK_SIZE
    }

    /// Stable name used in persisted records.
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyType::Aes128 => "aes-128",
            KeyType::Aes256 => "aes-256",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-128" => Ok(KeyType::Aes128),
            "aes-256" => Ok(KeyType::Aes256),
            other => Err(CoreError::UnknownKeyType(other.to_string())),
        }
    }
}

/// Secret bytes in one of their two states.
///
/// Plaintext is wiped from memory when dropped.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Plaintext key bytes.
    Decrypted(Zeroizing<Vec<u8>>),
    /// Ciphertext only.
    Encrypted(Vec<u8>),
}

impl KeyMaterial {
    /// Whether this material is ciphertext.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, KeyMaterial::Encrypted(_))
    }

    pub(crate) fn state_name(&self) -> &'static str {
        match self {
            KeyMaterial::Decrypted(_) => "decrypted",
            KeyMaterial::Encrypted(_) => "encrypted",
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Decrypted(_) => f.write_str("Decrypted(..)"),
            KeyMaterial::Encrypted(c) => write!(f, "Encrypted({} bytes)", c.len()),
        }
    }
}

/// A symmetric key that is either decrypted or encrypted, never both.
#[derive(Clone)]
pub struct ManagedKey {
    /// The key's algorithm.
    pub key_type: KeyType,

    /// IV used when this key is encrypted under another key.
    pub iv: Vec<u8>,

    material: KeyMaterial,

    /// Context name recorded by the KMS that produced this key.
    pub context_key: String,

    /// Context value recorded by the KMS that produced this key.
    pub context_value: String,
}

impl ManagedKey {
    /// Wrap plaintext key bytes.
    pub fn from_plaintext(key_type: KeyType, plaintext: Vec<u8>) -> Result<Self> {
        check_len("key", key_type.key_size(), plaintext.len())?;
        Ok(Self {
            key_type,
            iv: Vec::new(),
            material: KeyMaterial::Decrypted(Zeroizing::new(plaintext)),
            context_key: String::new(),
            context_value: String::new(),
        })
    }

    /// Wrap ciphertext loaded from storage.
    pub fn from_ciphertext(key_type: KeyType, iv: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            key_type,
            iv,
            material: KeyMaterial::Encrypted(ciphertext),
            context_key: String::new(),
            context_value: String::new(),
        }
    }

    /// Generate a fresh random decrypted key.
    pub fn generate(key_type: KeyType) -> Self {
        let mut bytes = vec![0u8; key_type.key_size()];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            key_type,
            iv: Vec::new(),
            material: KeyMaterial::Decrypted(Zeroizing::new(bytes)),
            context_key: String::new(),
            context_value: String::new(),
        }
    }

    /// Set the IV.
    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = iv.into();
        self
    }

    /// Set the KMS context.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_key = key.into();
        self.context_value = value.into();
        self
    }

    /// Replace the material with plaintext, keeping type, IV and context.
    pub fn with_plaintext(mut self, plaintext: Vec<u8>) -> Result<Self> {
        check_len("key", self.key_type.key_size(), plaintext.len())?;
        self.material = KeyMaterial::Decrypted(Zeroizing::new(plaintext));
        Ok(self)
    }

    /// Replace the material with ciphertext, keeping type, IV and context.
    pub fn with_ciphertext(mut self, ciphertext: Vec<u8>) -> Self {
        self.material = KeyMaterial::Encrypted(ciphertext);
        self
    }

    /// Borrow the key material.
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Whether only ciphertext is available.
    pub fn is_encrypted(&self) -> bool {
        self.material.is_encrypted()
    }

    /// The plaintext bytes, if decrypted.
    pub fn plaintext(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Decrypted(p) => Some(p.as_slice()),
            KeyMaterial::Encrypted(_) => None,
        }
    }

    /// The ciphertext bytes, if encrypted.
    pub fn ciphertext(&self) -> Option<&[u8]> {
        match &self.material {
            KeyMaterial::Decrypted(_) => None,
            KeyMaterial::Encrypted(c) => Some(c.as_slice()),
        }
    }

    /// Plaintext bytes or a state error.
    pub fn require_plaintext(&self) -> Result<&[u8]> {
        self.plaintext().ok_or_else(CoreError::expected_decrypted)
    }

    /// Ciphertext bytes or a state error.
    pub fn require_ciphertext(&self) -> Result<&[u8]> {
        self.ciphertext().ok_or_else(CoreError::expected_encrypted)
    }

    /// Encrypt this key under `key_key`.
    ///
    /// Both keys must be decrypted and this key must carry an IV.
    pub fn encrypt(&self, key_key: &ManagedKey) -> Result<ManagedKey> {
        let kek = key_key.require_plaintext()?;
        let plaintext = self.require_plaintext()?;
        if self.iv.is_empty() {
            return Err(CoreError::MissingIv);
        }

        let mut data = plaintext.to_vec();
        block::block_crypt(&self.iv, kek, &mut data, CryptMode::Encrypt)?;
        Ok(self.clone().with_ciphertext(data))
    }

    /// Decrypt this key with `key_key`.
    ///
    /// CBC carries no integrity check: the wrong `key_key` yields garbage,
    /// not an error. Callers that need to detect that verify a MAC first.
    pub fn decrypt(&self, key_key: &ManagedKey) -> Result<ManagedKey> {
        let kek = key_key.require_plaintext()?;
        let ciphertext = self.require_ciphertext()?;
        if self.iv.is_empty() {
            return Err(CoreError::MissingIv);
        }

        let mut data = Zeroizing::new(ciphertext.to_vec());
        block::block_crypt(&self.iv, kek, &mut data, CryptMode::Decrypt)?;
        self.clone().with_plaintext(data.to_vec())
    }

    /// AES-GCM encrypt `plaintext` under this key. Returns `(ciphertext, tag)`.
    pub fn encrypt_gcm(
        &self,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        block::encrypt_gcm(self.require_plaintext()?, nonce, plaintext, associated_data)
    }

    /// AES-GCM decrypt `ciphertext` under this key.
    pub fn decrypt_gcm(
        &self,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>> {
        block::decrypt_gcm(
            self.require_plaintext()?,
            nonce,
            ciphertext,
            tag,
            associated_data,
        )
    }

    /// Serialize the encrypted form to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
    }
}

impl fmt::Debug for ManagedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedKey")
            .field("key_type", &self.key_type)
            .field("material", &self.material)
            .field("context_key", &self.context_key)
            .field("context_value", &self.context_value)
            .finish()
    }
}

impl PartialEq for ManagedKey {
    fn eq(&self, other: &Self) -> bool {
        let same_material = match (&self.material, &other.material) {
            (KeyMaterial::Decrypted(a), KeyMaterial::Decrypted(b)) => a.as_slice() == b.as_slice(),
            (KeyMaterial::Encrypted(a), KeyMaterial::Encrypted(b)) => a == b,
            _ => false,
        };
        same_material
            && self.key_type == other.key_type
            && self.iv == other.iv
            && self.context_key == other.context_key
            && self.context_value == other.context_value
    }
}

impl Eq for ManagedKey {}

/// Persisted form of an encrypted [`ManagedKey`].
#[derive(Serialize, Deserialize)]
struct StoredKey {
    key_type: KeyType,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    context_key: String,
    context_value: String,
}

impl Serialize for ManagedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.material {
            KeyMaterial::Encrypted(ciphertext) => StoredKey {
                key_type: self.key_type,
                iv: self.iv.clone(),
                ciphertext: ciphertext.clone(),
                context_key: self.context_key.clone(),
                context_value: self.context_value.clone(),
            }
            .serialize(serializer),
            KeyMaterial::Decrypted(_) => Err(serde::ser::Error::custom(
                "refusing to serialize a decrypted key",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ManagedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let stored = StoredKey::deserialize(deserializer)?;
        Ok(ManagedKey::from_ciphertext(stored.key_type, stored.iv, stored.ciphertext)
            .with_context(stored.context_key, stored.context_value))
    }
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CoreError::InvalidLength {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}
