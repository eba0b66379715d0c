//! A concrete account built on [`AccountSecurity`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use roomkeys_core::{AccountId, KdfParams, ManagedKey, ManagedKeyPair};
use roomkeys_kms::{Kms, KmsConnector, KmsCredential};
use roomkeys_perms::{Account, PermsError};

use crate::error::{Result, RoomkeysError};
use crate::security::AccountSecurity;
use crate::staff::StaffCapability;

/// A user account: id, key security and optional staff access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    id: AccountId,
    security: AccountSecurity,
    #[serde(default)]
    staff: Option<StaffCapability>,
}

impl UserAccount {
    /// Wrap an existing security bundle.
    pub fn new(id: AccountId, security: AccountSecurity) -> Self {
        Self {
            id,
            security,
            staff: None,
        }
    }

    /// Create a new account with fresh keys.
    pub async fn register(
        kms: &dyn Kms,
        id: AccountId,
        password: &str,
        kdf: &KdfParams,
    ) -> Result<Self> {
        let security = AccountSecurity::new(kms, password, kdf).await?;
        info!(account = %id, "registered account");
        Ok(Self::new(id, security))
    }

    pub fn security(&self) -> &AccountSecurity {
        &self.security
    }

    pub fn security_mut(&mut self) -> &mut AccountSecurity {
        &mut self.security
    }

    /// Derive this account's client key.
    pub fn client_key(&self, password: &str) -> Result<ManagedKey> {
        self.security.client_key(password)
    }

    pub fn is_staff(&self) -> bool {
        self.staff.is_some()
    }

    /// Give this account staff access to the KMS named by `credential`.
    pub fn grant_staff(&mut self, credential: &KmsCredential) -> Result<()> {
        self.staff = Some(StaffCapability::issue(
            self.security.public_key(),
            credential,
        )?);
        info!(account = %self.id, backend = credential.backend(), "granted staff access");
        Ok(())
    }

    /// Remove staff access. Returns whether the account had it.
    pub fn revoke_staff(&mut self) -> bool {
        let had = self.staff.take().is_some();
        if had {
            info!(account = %self.id, "revoked staff access");
        }
        had
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

impl Account for UserAccount {
    fn id(&self) -> &AccountId {
        &self.id
    }

    fn key_pair(&self) -> &ManagedKeyPair {
        &self.security.key_pair
    }

    fn unlock(&self, client_key: &ManagedKey) -> std::result::Result<ManagedKeyPair, PermsError> {
        Ok(self.security.unlock(client_key)?)
    }

    fn unlock_staff_kms(
        &self,
        client_key: &ManagedKey,
        connector: &KmsConnector,
    ) -> std::result::Result<Arc<dyn Kms>, PermsError> {
        let staff = self.staff.as_ref().ok_or_else(|| {
            PermsError::AccessDenied(format!("account {} is not staff", self.id))
        })?;
        let key_pair = self.security.unlock(client_key)?;
        Ok(staff.connect(&key_pair, connector)?)
    }
}
