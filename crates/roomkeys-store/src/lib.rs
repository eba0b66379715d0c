//! # Roomkeys Store
//!
//! Capability table backends. Grant delegation only needs the
//! [`CapabilityTable`](roomkeys_perms::CapabilityTable) trait; this crate
//! provides its implementations plus holder queries via [`CapabilityStore`].
//!
//! ## Key Types
//!
//! - [`SqliteCapabilityTable`] - SQLite-based persistent storage
//! - [`MemoryCapabilityTable`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roomkeys_store::SqliteCapabilityTable;
//!
//! let table = SqliteCapabilityTable::open("capabilities.db").unwrap();
//! // Or use an in-memory database for testing
//! let table = SqliteCapabilityTable::open_memory().unwrap();
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use error::{Result, StoreError};
pub use memory::MemoryCapabilityTable;
pub use sqlite::SqliteCapabilityTable;
pub use traits::CapabilityStore;
