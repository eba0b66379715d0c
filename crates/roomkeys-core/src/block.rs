//! Block cipher and AEAD helpers.
//!
//! AES-CBC runs in place over block-aligned data; padding is the caller's
//! business (see [`pad`] and [`unpad`]). AES-GCM returns its tag separately
//! from the ciphertext so callers can persist the two as distinct values.

use aes::{Aes128, Aes256};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CoreError, Result};

/// AES block size in bytes, shared by every supported key type.
pub const BLOCK_SIZE: usize = 16;

/// Nonce size required by AES-GCM.
pub const GCM_NONCE_SIZE: usize = 12;

/// Authentication tag size produced by AES-GCM.
pub const GCM_TAG_SIZE: usize = 16;

/// Direction for [`block_crypt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptMode {
    Encrypt,
    Decrypt,
}

/// Run AES-CBC over `data` in place.
///
/// The key length selects AES-128 or AES-256. `data` must be a whole number
/// of blocks and `iv` exactly one block.
pub fn block_crypt(iv: &[u8], key: &[u8], data: &mut [u8], mode: CryptMode) -> Result<()> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(CoreError::NotBlockAligned(data.len()));
    }
    if iv.len() != BLOCK_SIZE {
        return Err(CoreError::InvalidLength {
            what: "IV",
            expected: BLOCK_SIZE,
            actual: iv.len(),
        });
    }

    match (key.len(), mode) {
        (16, CryptMode::Encrypt) => cbc_encrypt::<cbc::Encryptor<Aes128>>(key, iv, data),
        (16, CryptMode::Decrypt) => cbc_decrypt::<cbc::Decryptor<Aes128>>(key, iv, data),
        (32, CryptMode::Encrypt) => cbc_encrypt::<cbc::Encryptor<Aes256>>(key, iv, data),
        (32, CryptMode::Decrypt) => cbc_decrypt::<cbc::Decryptor<Aes256>>(key, iv, data),
        (actual, _) => Err(CoreError::InvalidLength {
            what: "key",
            expected: 32,
            actual,
        }),
    }
}

fn cbc_encrypt<E: KeyIvInit + BlockEncryptMut>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = E::new_from_slices(key, iv).map_err(|_| CoreError::InvalidLength {
        what: "key",
        expected: 32,
        actual: key.len(),
    })?;
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    let mut cipher = D::new_from_slices(key, iv).map_err(|_| CoreError::InvalidLength {
        what: "key",
        expected: 32,
        actual: key.len(),
    })?;
    for block in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

/// Pad `data` to a block boundary (PKCS#7).
///
/// Always appends at least one byte, so block-aligned input gains a full
/// block of padding.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let n = block_size - data.len() % block_size;
    let mut out = Vec::with_capacity(data.len() + n);
    out.extend_from_slice(data);
    out.resize(data.len() + n, n as u8);
    out
}

/// Strip padding added by [`pad`].
pub fn unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CoreError::MessageCorrupted);
    }
    let n = data[data.len() - 1] as usize;
    if n == 0 || n > block_size {
        return Err(CoreError::MessageCorrupted);
    }
    let (body, padding) = data.split_at(data.len() - n);
    if padding.iter().any(|&b| b as usize != n) {
        return Err(CoreError::MessageCorrupted);
    }
    Ok(body.to_vec())
}

/// Fit an arbitrary nonce to the AES-GCM nonce size by zero-extending or
/// truncating it.
pub fn gcm_nonce(nonce: &[u8]) -> [u8; GCM_NONCE_SIZE] {
    let mut out = [0u8; GCM_NONCE_SIZE];
    let n = nonce.len().min(GCM_NONCE_SIZE);
    out[..n].copy_from_slice(&nonce[..n]);
    out
}

/// AES-GCM encrypt with associated data.
///
/// Returns `(ciphertext, tag)`.
pub fn encrypt_gcm(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    match key.len() {
        16 => gcm_seal::<Aes128Gcm>(key, nonce, plaintext, associated_data),
        32 => gcm_seal::<Aes256Gcm>(key, nonce, plaintext, associated_data),
        actual => Err(CoreError::InvalidLength {
            what: "key",
            expected: 32,
            actual,
        }),
    }
}

/// AES-GCM decrypt with associated data.
///
/// A tag that does not verify yields [`CoreError::IntegrityFailed`].
pub fn decrypt_gcm(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    if tag.len() != GCM_TAG_SIZE {
        return Err(CoreError::InvalidLength {
            what: "tag",
            expected: GCM_TAG_SIZE,
            actual: tag.len(),
        });
    }
    match key.len() {
        16 => gcm_open::<Aes128Gcm>(key, nonce, ciphertext, tag, associated_data),
        32 => gcm_open::<Aes256Gcm>(key, nonce, ciphertext, tag, associated_data),
        actual => Err(CoreError::InvalidLength {
            what: "key",
            expected: 32,
            actual,
        }),
    }
}

fn gcm_seal<A: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let cipher = A::new_from_slice(key).map_err(|_| CoreError::InvalidLength {
        what: "key",
        expected: 32,
        actual: key.len(),
    })?;
    let nonce = gcm_nonce(nonce);
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), associated_data, &mut buffer)
        .map_err(|e| CoreError::Encoding(e.to_string()))?;
    Ok((buffer, tag.to_vec()))
}

fn gcm_open<A: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|_| CoreError::InvalidLength {
        what: "key",
        expected: 32,
        actual: key.len(),
    })?;
    let nonce = gcm_nonce(nonce);
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&nonce),
            associated_data,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CoreError::IntegrityFailed)?;
    Ok(buffer)
}
