//! Capabilities sealed to a holder's Curve25519 public key.
//!
//! The identifier is the box of the subject nonce under itself, keyed by
//! the subject and holder key pairs. Because box keys are symmetric in the
//! two parties, the holder can recompute it from their own private key and
//! the subject's public key without any lookup table.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use roomkeys_core::{CapabilityId, CoreError, ManagedKeyPair, SubjectNonce, NONCE_SIZE};

use crate::error::Result;

/// A capability opened with the holder's private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCapability {
    pub id: CapabilityId,

    /// Readable by anyone who can fetch the capability.
    pub public_payload: Vec<u8>,

    /// Random 24-byte box nonce followed by the sealed private payload.
    pub encrypted_private_payload: Vec<u8>,
}

impl PublicKeyCapability {
    /// Compute the identifier from either side of the exchange.
    ///
    /// `own` must be decrypted. Pass the subject pair with the holder's
    /// public key, or the holder pair with the subject's public key.
    pub fn compute_id(
        nonce: &SubjectNonce,
        own: &ManagedKeyPair,
        peer_public_key: &[u8],
    ) -> Result<CapabilityId> {
        let sealed = own.seal_to(nonce.as_bytes(), nonce.as_bytes(), peer_public_key)?;
        Ok(CapabilityId::from_raw(&sealed))
    }

    /// Seal `private_payload` from `subject` to `holder_public_key`.
    pub fn new(
        nonce: &SubjectNonce,
        subject: &ManagedKeyPair,
        holder_public_key: &[u8],
        public_payload: Vec<u8>,
        private_payload: &[u8],
    ) -> Result<Self> {
        let id = Self::compute_id(nonce, subject, holder_public_key)?;

        // Fresh box nonce; the subject nonce is already spent on the id.
        let box_nonce = SubjectNonce::generate();
        let sealed = subject.seal_to(private_payload, box_nonce.as_bytes(), holder_public_key)?;

        let mut encrypted_private_payload = Vec::with_capacity(NONCE_SIZE + sealed.len());
        encrypted_private_payload.extend_from_slice(box_nonce.as_bytes());
        encrypted_private_payload.extend_from_slice(&sealed);

        Ok(Self {
            id,
            public_payload,
            encrypted_private_payload,
        })
    }

    /// Recover the private payload with the holder's decrypted key pair.
    pub fn open(
        &self,
        holder: &ManagedKeyPair,
        subject_public_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        if self.encrypted_private_payload.len() < NONCE_SIZE {
            return Err(CoreError::IntegrityFailed.into());
        }
        let (box_nonce, sealed) = self.encrypted_private_payload.split_at(NONCE_SIZE);
        let plaintext = holder.open_from(sealed, box_nonce, subject_public_key)?;
        Ok(Zeroizing::new(plaintext))
    }
}
