//! Staff access: a KMS credential sealed to an account.
//!
//! The credential is sealed with a throwaway subject key pair whose public
//! half travels in the capability's public payload, so only the holder's
//! private key is needed to recover it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use roomkeys_core::{KeyPairType, ManagedKeyPair, SubjectNonce};
use roomkeys_kms::{Kms, KmsConnector, KmsCredential};
use roomkeys_perms::PublicKeyCapability;

use crate::error::{Result, RoomkeysError};

/// Public half of a staff capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StaffHeader {
    subject_public_key: Vec<u8>,
    nonce: SubjectNonce,
}

/// A KMS credential only the holding account can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffCapability(PublicKeyCapability);

impl StaffCapability {
    /// Seal `credential` to `holder_public_key`.
    pub fn issue(holder_public_key: &[u8], credential: &KmsCredential) -> Result<Self> {
        let subject = KeyPairType::Curve25519.generate();
        let nonce = SubjectNonce::generate();
        let header = StaffHeader {
            subject_public_key: subject.public_key.clone(),
            nonce,
        };

        let mut public_payload = Vec::new();
        ciborium::into_writer(&header, &mut public_payload)
            .map_err(|e| RoomkeysError::Serialization(e.to_string()))?;

        let capability = PublicKeyCapability::new(
            &nonce,
            &subject,
            holder_public_key,
            public_payload,
            credential.to_json()?.as_bytes(),
        )?;
        Ok(Self(capability))
    }

    /// The underlying capability.
    pub fn capability(&self) -> &PublicKeyCapability {
        &self.0
    }

    fn header(&self) -> Result<StaffHeader> {
        ciborium::from_reader(self.0.public_payload.as_slice())
            .map_err(|e| RoomkeysError::Serialization(e.to_string()))
    }

    /// Recover the credential with the holder's decrypted key pair.
    pub fn open(&self, holder: &ManagedKeyPair) -> Result<KmsCredential> {
        let header = self.header()?;
        let expected =
            PublicKeyCapability::compute_id(&header.nonce, holder, &header.subject_public_key)?;
        if expected != self.0.id {
            return Err(RoomkeysError::AccessDenied(
                "staff capability belongs to another account".to_string(),
            ));
        }

        let plaintext = self.0.open(holder, &header.subject_public_key)?;
        let json = std::str::from_utf8(&plaintext)
            .map_err(|e| RoomkeysError::Serialization(e.to_string()))?;
        Ok(KmsCredential::from_json(json)?)
    }

    /// Open the credential and connect to the KMS it names.
    pub fn connect(
        &self,
        holder: &ManagedKeyPair,
        connector: &KmsConnector,
    ) -> Result<Arc<dyn Kms>> {
        let credential = self.open(holder)?;
        Ok(connector.connect(&credential)?)
    }
}
