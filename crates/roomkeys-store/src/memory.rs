//! In-memory capability table.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use roomkeys_core::{AccountId, CapabilityId};
use roomkeys_perms::{Capability, CapabilityTable, PermsError};

use crate::error::{Result, StoreError};
use crate::traits::CapabilityStore;

struct StoredCapability {
    holder: Option<AccountId>,
    capability: Capability,
}

/// In-memory capability table.
///
/// All data is lost when the table is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryCapabilityTable {
    inner: RwLock<HashMap<CapabilityId, StoredCapability>>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Task(format!("lock poisoned: {}", e))
}

impl MemoryCapabilityTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Holder recorded for a capability, if any.
    pub fn holder_of(&self, id: &CapabilityId) -> Result<Option<AccountId>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(id).and_then(|s| s.holder.clone()))
    }
}

#[async_trait]
impl CapabilityTable for MemoryCapabilityTable {
    async fn get(&self, id: &CapabilityId) -> std::result::Result<Option<Capability>, PermsError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.get(id).map(|s| s.capability.clone()))
    }

    async fn save(
        &self,
        holder_account: Option<&AccountId>,
        capability: &Capability,
    ) -> std::result::Result<(), PermsError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.insert(
            capability.id().clone(),
            StoredCapability {
                holder: holder_account.cloned(),
                capability: capability.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &CapabilityId) -> std::result::Result<bool, PermsError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner.remove(id).is_some())
    }
}

#[async_trait]
impl CapabilityStore for MemoryCapabilityTable {
    async fn list_by_holder(&self, holder: &AccountId) -> Result<Vec<Capability>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut caps: Vec<Capability> = inner
            .values()
            .filter(|s| s.holder.as_ref() == Some(holder))
            .map(|s| s.capability.clone())
            .collect();
        caps.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(caps)
    }

    async fn remove_by_holder(&self, holder: &AccountId) -> Result<usize> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let before = inner.len();
        inner.retain(|_, s| s.holder.as_ref() != Some(holder));
        Ok(before - inner.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().map_err(poisoned)?.len())
    }
}
