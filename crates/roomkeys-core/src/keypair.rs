//! Managed asymmetric key pairs.
//!
//! Curve25519 key pairs whose private half may be stored encrypted under a
//! symmetric key-encrypting key. Boxing uses XSalsa20-Poly1305 over an
//! X25519 shared secret, so `seal(m, n, peer_pub, my_priv)` opens with
//! `open(c, n, my_pub, peer_priv)`.

use std::fmt;

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::Aead;
use crypto_box::SalsaBox;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::block::{self, CryptMode};
use crate::error::{CoreError, Result};
use crate::keys::{check_len, KeyMaterial, ManagedKey};

/// Supported key pair types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPairType {
    #[serde(rename = "curve25519")]
    Curve25519,
}

impl KeyPairType {
    pub const fn private_key_size(self) -> usize {
        32
    }

    pub const fn public_key_size(self) -> usize {
        32
    }

    /// Nonce size for `seal` and `open`.
    pub const fn nonce_size(self) -> usize {
        24
    }

    pub const fn as_str(self) -> &'static str {
        "curve25519"
    }

    /// Generate a fresh random key pair.
    pub fn generate(self) -> ManagedKeyPair {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(seed.as_mut());
        self.pair_from_secret(*seed)
    }

    /// Deterministically derive a key pair from a 32-byte seed.
    pub fn generate_from(self, seed: &[u8]) -> Result<ManagedKeyPair> {
        let seed = to_array("seed", seed)?;
        Ok(self.pair_from_secret(seed))
    }

    fn pair_from_secret(self, secret: [u8; 32]) -> ManagedKeyPair {
        let static_secret = StaticSecret::from(secret);
        let public = PublicKey::from(&static_secret);
        ManagedKeyPair {
            key_pair_type: self,
            iv: Vec::new(),
            private: KeyMaterial::Decrypted(Zeroizing::new(static_secret.to_bytes().to_vec())),
            public_key: public.as_bytes().to_vec(),
        }
    }

    /// Authenticated-encrypt `message` from `private_key` to `peer_public_key`.
    pub fn seal(
        self,
        message: &[u8],
        nonce: &[u8],
        peer_public_key: &[u8],
        private_key: &[u8],
    ) -> Result<Vec<u8>> {
        let (salsa, nonce) = self.salsa_box(nonce, peer_public_key, private_key)?;
        salsa
            .encrypt(GenericArray::from_slice(nonce), message)
            .map_err(|_| CoreError::IntegrityFailed)
    }

    /// Open a box produced by [`KeyPairType::seal`].
    pub fn open(
        self,
        ciphertext: &[u8],
        nonce: &[u8],
        peer_public_key: &[u8],
        private_key: &[u8],
    ) -> Result<Vec<u8>> {
        let (salsa, nonce) = self.salsa_box(nonce, peer_public_key, private_key)?;
        salsa
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|_| CoreError::IntegrityFailed)
    }

    fn salsa_box<'n>(
        self,
        nonce: &'n [u8],
        peer_public_key: &[u8],
        private_key: &[u8],
    ) -> Result<(SalsaBox, &'n [u8])> {
        check_len("nonce", self.nonce_size(), nonce.len())?;
        let public = crypto_box::PublicKey::from(to_array("public key", peer_public_key)?);
        let secret = crypto_box::SecretKey::from(to_array("private key", private_key)?);
        Ok((SalsaBox::new(&public, &secret), nonce))
    }
}

/// A Curve25519 key pair whose private key is either decrypted or encrypted.
#[derive(Clone)]
pub struct ManagedKeyPair {
    pub key_pair_type: KeyPairType,

    /// IV used when the private key is encrypted under another key.
    pub iv: Vec<u8>,

    private: KeyMaterial,

    /// Public key bytes. Never encrypted.
    pub public_key: Vec<u8>,
}

impl ManagedKeyPair {
    /// Wrap a stored pair whose private key is ciphertext.
    pub fn from_encrypted(
        key_pair_type: KeyPairType,
        iv: Vec<u8>,
        encrypted_private_key: Vec<u8>,
        public_key: Vec<u8>,
    ) -> Self {
        Self {
            key_pair_type,
            iv,
            private: KeyMaterial::Encrypted(encrypted_private_key),
            public_key,
        }
    }

    /// Set the IV.
    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.iv = iv.into();
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.private.is_encrypted()
    }

    /// Plaintext private key, if decrypted.
    pub fn private_key(&self) -> Option<&[u8]> {
        match &self.private {
            KeyMaterial::Decrypted(p) => Some(p.as_slice()),
            KeyMaterial::Encrypted(_) => None,
        }
    }

    /// Encrypted private key, if encrypted.
    pub fn encrypted_private_key(&self) -> Option<&[u8]> {
        match &self.private {
            KeyMaterial::Decrypted(_) => None,
            KeyMaterial::Encrypted(c) => Some(c.as_slice()),
        }
    }

    /// Plaintext private key or a state error.
    pub fn require_private_key(&self) -> Result<&[u8]> {
        self.private_key().ok_or_else(CoreError::expected_decrypted)
    }

    /// Encrypt the private key under `key_key`. The public key is unchanged.
    pub fn encrypt(&self, key_key: &ManagedKey) -> Result<ManagedKeyPair> {
        let kek = key_key.require_plaintext()?;
        let private = self.require_private_key()?;
        if self.iv.is_empty() {
            return Err(CoreError::MissingIv);
        }

        let mut data = private.to_vec();
        block::block_crypt(&self.iv, kek, &mut data, CryptMode::Encrypt)?;
        let mut out = self.clone();
        out.private = KeyMaterial::Encrypted(data);
        Ok(out)
    }

    /// Decrypt the private key with `key_key`.
    pub fn decrypt(&self, key_key: &ManagedKey) -> Result<ManagedKeyPair> {
        let kek = key_key.require_plaintext()?;
        let ciphertext = self
            .encrypted_private_key()
            .ok_or_else(CoreError::expected_encrypted)?;
        if self.iv.is_empty() {
            return Err(CoreError::MissingIv);
        }

        let mut data = Zeroizing::new(ciphertext.to_vec());
        block::block_crypt(&self.iv, kek, &mut data, CryptMode::Decrypt)?;
        let mut out = self.clone();
        out.private = KeyMaterial::Decrypted(data);
        Ok(out)
    }

    /// Seal `message` to `peer_public_key` with this pair's private key.
    pub fn seal_to(&self, message: &[u8], nonce: &[u8], peer_public_key: &[u8]) -> Result<Vec<u8>> {
        self.key_pair_type
            .seal(message, nonce, peer_public_key, self.require_private_key()?)
    }

    /// Open a box from `peer_public_key` with this pair's private key.
    pub fn open_from(
        &self,
        ciphertext: &[u8],
        nonce: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Vec<u8>> {
        self.key_pair_type
            .open(ciphertext, nonce, peer_public_key, self.require_private_key()?)
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

impl fmt::Debug for ManagedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedKeyPair")
            .field("key_pair_type", &self.key_pair_type)
            .field("private", &self.private)
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredKeyPair {
    key_pair_type: KeyPairType,
    iv: Vec<u8>,
    encrypted_private_key: Vec<u8>,
    public_key: Vec<u8>,
}

impl Serialize for ManagedKeyPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.private {
            KeyMaterial::Encrypted(ciphertext) => StoredKeyPair {
                key_pair_type: self.key_pair_type,
                iv: self.iv.clone(),
                encrypted_private_key: ciphertext.clone(),
                public_key: self.public_key.clone(),
            }
            .serialize(serializer),
            KeyMaterial::Decrypted(_) => Err(serde::ser::Error::custom(
                "refusing to serialize a decrypted private key",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ManagedKeyPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let stored = StoredKeyPair::deserialize(deserializer)?;
        Ok(ManagedKeyPair::from_encrypted(
            stored.key_pair_type,
            stored.iv,
            stored.encrypted_private_key,
            stored.public_key,
        ))
    }
}

fn to_array(what: &'static str, bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| CoreError::InvalidLength {
        what,
        expected: 32,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyType;

    #[test]
    fn test_generate_from_is_deterministic() {
        let a = KeyPairType::Curve25519.generate_from(&[7u8; 32]).unwrap();
        let b = KeyPairType::Curve25519.generate_from(&[7u8; 32]).unwrap();
        assert_eq!(a.public_key, b.public_key);
        assert_eq!(a.private_key(), b.private_key());
        assert_eq!(a.public_key.len(), 32);
    }

    #[test]
    fn test_public_key_matches_box_derivation() {
        let pair = KeyPairType::Curve25519.generate();
        let secret = crypto_box::SecretKey::from(to_array("k", pair.private_key().unwrap()).unwrap());
        assert_eq!(secret.public_key().as_bytes().as_slice(), &pair.public_key[..]);
    }

    #[test]
    fn test_generate_from_rejects_short_seed() {
        let err = KeyPairType::Curve25519.generate_from(&[0u8; 31]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Structural);
    }

    #[test]
    fn test_seal_open_symmetry() {
        let alice = KeyPairType::Curve25519.generate();
        let bob = KeyPairType::Curve25519.generate();
        let nonce = [9u8; 24];

        let sealed = alice.seal_to(b"hello", &nonce, &bob.public_key).unwrap();
        assert_eq!(sealed.len(), 5 + 16);
        let opened = bob.open_from(&sealed, &nonce, &alice.public_key).unwrap();
        assert_eq!(opened, b"hello");

        // The same box is produced from either side of the exchange.
        let mirrored = bob.seal_to(b"hello", &nonce, &alice.public_key).unwrap();
        assert_eq!(mirrored, sealed);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let alice = KeyPairType::Curve25519.generate();
        let bob = KeyPairType::Curve25519.generate();
        let eve = KeyPairType::Curve25519.generate();
        let nonce = [1u8; 24];

        let sealed = alice.seal_to(b"secret", &nonce, &bob.public_key).unwrap();
        let err = eve.open_from(&sealed, &nonce, &alice.public_key).unwrap_err();
        assert!(matches!(err, CoreError::IntegrityFailed));
    }

    #[test]
    fn test_seal_rejects_bad_nonce() {
        let alice = KeyPairType::Curve25519.generate();
        let err = alice.seal_to(b"x", &[0u8; 12], &alice.public_key).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLength { what: "nonce", .. }));
    }

    #[test]
    fn test_private_key_encryption_roundtrip() {
        let kek = ManagedKey::generate(KeyType::Aes256);
        let pair = KeyPairType::Curve25519.generate().with_iv(vec![2u8; 16]);

        let locked = pair.encrypt(&kek).unwrap();
        assert!(locked.is_encrypted());
        assert_eq!(locked.public_key, pair.public_key);
        assert!(locked.private_key().is_none());

        let unlocked = locked.decrypt(&kek).unwrap();
        assert_eq!(unlocked.private_key(), pair.private_key());
    }

    #[test]
    fn test_serialization_refuses_plaintext() {
        let kek = ManagedKey::generate(KeyType::Aes128);
        let pair = KeyPairType::Curve25519.generate().with_iv(vec![4u8; 16]);
        assert!(pair.to_bytes().is_err());

        let locked = pair.encrypt(&kek).unwrap();
        let restored = ManagedKeyPair::from_bytes(&locked.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.public_key, locked.public_key);
        assert_eq!(restored.encrypted_private_key(), locked.encrypted_private_key());
        assert_eq!(restored.iv, locked.iv);
    }
}
