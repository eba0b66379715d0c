//! CapabilityTable trait: the persistence interface for capabilities.
//!
//! Implementations live in `roomkeys-store` (SQLite and in-memory).

use async_trait::async_trait;
use roomkeys_core::{AccountId, CapabilityId};

use crate::capability::Capability;
use crate::error::Result;

/// Async storage for capabilities keyed by identifier.
///
/// Consistency is owned by the implementation; callers add no locking.
#[async_trait]
pub trait CapabilityTable: Send + Sync {
    /// Fetch a capability by id.
    async fn get(&self, id: &CapabilityId) -> Result<Option<Capability>>;

    /// Store a capability, replacing any with the same id.
    ///
    /// `holder_account` is set for account grants and `None` for passcodes.
    async fn save(&self, holder_account: Option<&AccountId>, capability: &Capability)
        -> Result<()>;

    /// Delete a capability. Returns whether it existed.
    async fn remove(&self, id: &CapabilityId) -> Result<bool>;
}
