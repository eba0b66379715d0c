//! SQLite implementation of the capability table.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use roomkeys_core::{AccountId, CapabilityId};
use roomkeys_perms::{Capability, CapabilityTable, PermsError};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::CapabilityStore;

/// SQLite-backed capability table.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteCapabilityTable {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCapabilityTable {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("mutex poisoned: {}", e)))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }

    async fn get_row(&self, id: &CapabilityId) -> Result<Option<Capability>> {
        let id = id.as_str().to_string();
        self.blocking(move |conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT capability FROM capabilities WHERE capability_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            blob.map(|b| decode(&b)).transpose()
        })
        .await
    }

    async fn save_row(&self, holder: Option<&AccountId>, capability: &Capability) -> Result<()> {
        let id = capability.id().as_str().to_string();
        let holder = holder.map(|h| h.as_str().to_string());
        let kind = capability.kind().as_str();
        let blob = capability
            .to_bytes()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO capabilities
                    (capability_id, holder_account, kind, capability, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, holder, kind, blob, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_row(&self, id: &CapabilityId) -> Result<bool> {
        let id = id.as_str().to_string();
        self.blocking(move |conn| {
            let n = conn.execute(
                "DELETE FROM capabilities WHERE capability_id = ?1",
                params![id],
            )?;
            Ok(n > 0)
        })
        .await
    }
}

fn decode(blob: &[u8]) -> Result<Capability> {
    Capability::from_bytes(blob).map_err(|e| StoreError::InvalidData(e.to_string()))
}

#[async_trait]
impl CapabilityTable for SqliteCapabilityTable {
    async fn get(&self, id: &CapabilityId) -> std::result::Result<Option<Capability>, PermsError> {
        Ok(self.get_row(id).await?)
    }

    async fn save(
        &self,
        holder_account: Option<&AccountId>,
        capability: &Capability,
    ) -> std::result::Result<(), PermsError> {
        self.save_row(holder_account, capability).await?;
        debug!(capability = capability.id().short(), "saved capability");
        Ok(())
    }

    async fn remove(&self, id: &CapabilityId) -> std::result::Result<bool, PermsError> {
        Ok(self.remove_row(id).await?)
    }
}

#[async_trait]
impl CapabilityStore for SqliteCapabilityTable {
    async fn list_by_holder(&self, holder: &AccountId) -> Result<Vec<Capability>> {
        let holder = holder.as_str().to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT capability FROM capabilities
                 WHERE holder_account = ?1 ORDER BY capability_id",
            )?;
            let blobs = stmt
                .query_map(params![holder], |row| row.get::<_, Vec<u8>>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            blobs.iter().map(|b| decode(b)).collect()
        })
        .await
    }

    async fn remove_by_holder(&self, holder: &AccountId) -> Result<usize> {
        let holder = holder.as_str().to_string();
        self.blocking(move |conn| {
            Ok(conn.execute(
                "DELETE FROM capabilities WHERE holder_account = ?1",
                params![holder],
            )?)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM capabilities", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }
}
