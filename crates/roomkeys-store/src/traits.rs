//! Store-side capability queries beyond the core table interface.
//!
//! [`CapabilityTable`] is all grant delegation needs. Account lifecycle
//! code also needs to find and purge capabilities by holder, which is what
//! [`CapabilityStore`] adds.

use async_trait::async_trait;
use roomkeys_core::AccountId;
use roomkeys_perms::{Capability, CapabilityTable};

use crate::error::Result;

/// A capability table that can be queried by holder.
#[async_trait]
pub trait CapabilityStore: CapabilityTable {
    /// All capabilities held by an account.
    async fn list_by_holder(&self, holder: &AccountId) -> Result<Vec<Capability>>;

    /// Delete every capability held by an account. Returns how many were removed.
    async fn remove_by_holder(&self, holder: &AccountId) -> Result<usize>;

    /// Total number of stored capabilities.
    async fn count(&self) -> Result<usize>;
}
