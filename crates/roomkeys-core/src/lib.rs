//! # Roomkeys Core
//!
//! Key primitives for Roomkeys: managed symmetric keys, managed Curve25519
//! key pairs, AES block and AEAD helpers, and password-based derivation.
//!
//! This crate contains no I/O, no storage, no networking. Every
//! transformation is pure: `encrypt` and `decrypt` return new values.
//!
//! ## Key Types
//!
//! - [`ManagedKey`] - AES key that is either decrypted or encrypted
//! - [`ManagedKeyPair`] - Curve25519 box key pair with an encryptable private half
//! - [`SubjectNonce`] - 24 bytes binding capabilities to a protected secret
//! - [`CapabilityId`] - Deterministic capability identifier
//!
//! ## Persistence
//!
//! Keys serialize to CBOR only in their encrypted form.

pub mod block;
pub mod error;
pub mod kdf;
pub mod keypair;
pub mod keys;
pub mod types;

pub use block::{block_crypt, decrypt_gcm, encrypt_gcm, pad, unpad, CryptMode, BLOCK_SIZE};
pub use error::{CoreError, ErrorKind, Result};
pub use kdf::{derive_key, KdfParams};
pub use keypair::{KeyPairType, ManagedKeyPair};
pub use keys::{KeyMaterial, KeyType, ManagedKey};
pub use types::{AccountId, CapabilityId, SubjectNonce, NONCE_SIZE};
