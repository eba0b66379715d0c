//! Test doubles for the capability table and accounts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roomkeys_core::{
    AccountId, CapabilityId, KdfParams, KeyPairType, KeyType, ManagedKey, ManagedKeyPair,
};
use roomkeys_kms::{Kms, KmsConnector};

use crate::account::Account;
use crate::capability::Capability;
use crate::error::{PermsError, Result};
use crate::table::CapabilityTable;

pub(crate) fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

#[derive(Default)]
pub(crate) struct MapTable {
    rows: Mutex<HashMap<CapabilityId, (Option<AccountId>, Capability)>>,
}

impl MapTable {
    pub(crate) fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub(crate) fn holder_of(&self, id: &CapabilityId) -> Option<AccountId> {
        self.rows
            .lock()
            .unwrap()
            .get(id)
            .and_then(|(holder, _)| holder.clone())
    }
}

#[async_trait]
impl CapabilityTable for MapTable {
    async fn get(&self, id: &CapabilityId) -> Result<Option<Capability>> {
        Ok(self.rows.lock().unwrap().get(id).map(|(_, c)| c.clone()))
    }

    async fn save(&self, holder_account: Option<&AccountId>, capability: &Capability) -> Result<()> {
        self.rows.lock().unwrap().insert(
            capability.id().clone(),
            (holder_account.cloned(), capability.clone()),
        );
        Ok(())
    }

    async fn remove(&self, id: &CapabilityId) -> Result<bool> {
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }
}

/// Account whose key pair is encrypted directly under its client key.
pub(crate) struct TestAccount {
    id: AccountId,
    pub key: ManagedKey,
    key_pair: ManagedKeyPair,
}

impl TestAccount {
    pub(crate) fn new(id: &str) -> Self {
        let key = ManagedKey::generate(KeyType::Aes256);
        let key_pair = KeyPairType::Curve25519
            .generate()
            .with_iv(vec![0u8; 16])
            .encrypt(&key)
            .unwrap();
        Self {
            id: AccountId::new(id),
            key,
            key_pair,
        }
    }
}

impl Account for TestAccount {
    fn id(&self) -> &AccountId {
        &self.id
    }

    fn key_pair(&self) -> &ManagedKeyPair {
        &self.key_pair
    }

    fn unlock(&self, client_key: &ManagedKey) -> Result<ManagedKeyPair> {
        Ok(self.key_pair.decrypt(client_key)?)
    }

    fn unlock_staff_kms(
        &self,
        _client_key: &ManagedKey,
        _connector: &KmsConnector,
    ) -> Result<Arc<dyn Kms>> {
        Err(PermsError::AccessDenied("not staff".to_string()))
    }
}
