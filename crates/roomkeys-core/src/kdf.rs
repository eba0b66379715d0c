//! Password-based key derivation (Argon2id).

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};
use crate::keys::{KeyType, ManagedKey};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn argon2(&self, output_len: usize) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(output_len),
        )
        .map_err(|e| CoreError::KeyDerivation(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Derive a decrypted key of `key_type` from `password` and `salt`.
///
/// The same inputs always produce the same key.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    key_type: KeyType,
    params: &KdfParams,
) -> Result<ManagedKey> {
    let mut out = Zeroizing::new(vec![0u8; key_type.key_size()]);
    params
        .argon2(out.len())?
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| CoreError::KeyDerivation(e.to_string()))?;
    ManagedKey::from_plaintext(key_type, out.to_vec())
}
