//! The account interface capabilities are granted to.

use std::sync::Arc;

use roomkeys_core::{AccountId, ManagedKey, ManagedKeyPair};
use roomkeys_kms::{Kms, KmsConnector};

use crate::error::Result;

/// An account that can hold capabilities.
pub trait Account: Send + Sync {
    fn id(&self) -> &AccountId;

    /// The account key pair. The public key is always available; the
    /// private key is encrypted.
    fn key_pair(&self) -> &ManagedKeyPair;

    /// Decrypt the account key pair with the password-derived client key.
    fn unlock(&self, client_key: &ManagedKey) -> Result<ManagedKeyPair>;

    /// Open the account's staff capability and connect to the KMS it names.
    ///
    /// Fails with `AccessDenied` for accounts without staff access.
    fn unlock_staff_kms(
        &self,
        client_key: &ManagedKey,
        connector: &KmsConnector,
    ) -> Result<Arc<dyn Kms>>;
}
