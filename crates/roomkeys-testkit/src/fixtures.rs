//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use roomkeys::{Keyring, SecurityConfig, UserAccount};
use roomkeys_core::KdfParams;
use roomkeys_kms::{KmsConfig, KmsCredential, LocalKms};
use roomkeys_perms::{CapabilityTable, GrantManager};
use roomkeys_store::MemoryCapabilityTable;

/// Master key used by every fixture KMS.
pub const ZERO_MASTER_KEY: [u8; 32] = [0u8; 32];

/// A local KMS over the all-zero master key.
pub fn zero_kms() -> LocalKms {
    LocalKms::new(&ZERO_MASTER_KEY).unwrap()
}

/// Argon2id parameters cheap enough for tests.
pub fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

/// Configuration with the zero master key and fast stretching.
pub fn test_config() -> SecurityConfig {
    SecurityConfig {
        kdf: fast_kdf(),
        kms: KmsConfig {
            credential: Some(KmsCredential::local(&ZERO_MASTER_KEY)),
            ..KmsConfig::default()
        },
    }
}

/// The password fixtures register `name` with.
pub fn password_for(name: &str) -> String {
    format!("{}-password", name)
}

/// A test keyring over any table, e.g. SQLite.
pub fn keyring_over(table: Arc<dyn CapabilityTable>) -> Keyring {
    Keyring::new(test_config(), table).unwrap()
}

/// A keyring over a memory capability table.
pub struct TestFixture {
    pub keyring: Keyring,
    pub table: Arc<MemoryCapabilityTable>,
}

impl TestFixture {
    /// Create a new fixture with an empty table.
    pub fn new() -> Self {
        let table = Arc::new(MemoryCapabilityTable::new());
        let keyring = keyring_over(table.clone());
        Self { keyring, table }
    }

    /// Register `name` with [`password_for`].
    pub async fn account(&self, name: &str) -> UserAccount {
        self.keyring
            .register(name, &password_for(name))
            .await
            .unwrap()
    }

    /// Create a room and give `owner` the first capability on it.
    pub async fn room_owned_by(&self, owner: &UserAccount, room: &str) -> GrantManager {
        let manager = self
            .keyring
            .create_subject("room", room, room.as_bytes().to_vec())
            .await
            .unwrap();
        manager
            .staff_grant_to_account(self.keyring.kms(), owner)
            .await
            .unwrap();
        manager
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
