//! The Keyring: one entry point over KMS, accounts and capabilities.
//!
//! A `Keyring` owns the configured KMS and the capability table, and hands
//! out [`GrantManager`]s for individual subjects (rooms).

use std::fmt;
use std::sync::Arc;

use tracing::info;

use roomkeys_core::AccountId;
use roomkeys_kms::{Kms, KmsConnector};
use roomkeys_perms::{Account, CapabilityTable, GrantManager, GrantSubject};

use crate::account::UserAccount;
use crate::config::SecurityConfig;
use crate::error::Result;

/// Shared services for account and room key management.
pub struct Keyring {
    kms: Arc<dyn Kms>,
    table: Arc<dyn CapabilityTable>,
    connector: KmsConnector,
    config: SecurityConfig,
}

impl Keyring {
    /// Create a keyring from configuration.
    ///
    /// Without a configured credential the KMS is present but unconfigured,
    /// and every operation that needs it fails with `Unavailable`.
    pub fn new(config: SecurityConfig, table: Arc<dyn CapabilityTable>) -> Result<Self> {
        let connector = KmsConnector::from_config(&config.kms);
        let kms = connector.connect_configured(&config.kms)?;
        Ok(Self {
            kms,
            table,
            connector,
            config,
        })
    }

    /// Replace the KMS, e.g. with a provider-backed one.
    pub fn with_kms(mut self, kms: Arc<dyn Kms>) -> Self {
        self.kms = kms;
        self
    }

    /// Use a connector that knows about external providers.
    pub fn with_connector(mut self, connector: KmsConnector) -> Self {
        self.connector = connector;
        self
    }

    pub fn kms(&self) -> &dyn Kms {
        self.kms.as_ref()
    }

    pub fn connector(&self) -> &KmsConnector {
        &self.connector
    }

    pub fn table(&self) -> &Arc<dyn CapabilityTable> {
        &self.table
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account with fresh keys.
    pub async fn register(&self, id: impl Into<AccountId>, password: &str) -> Result<UserAccount> {
        UserAccount::register(self.kms.as_ref(), id.into(), password, &self.config.kdf).await
    }

    /// Set a new password through the KMS, without the old one.
    pub async fn reset_password(&self, account: &mut UserAccount, new_password: &str) -> Result<()> {
        account
            .security_mut()
            .reset_password(self.kms.as_ref(), new_password)
            .await?;
        info!(account = %account.id(), "password reset");
        Ok(())
    }

    /// Connect to the KMS an account's staff capability names.
    pub fn staff_kms(&self, account: &UserAccount, password: &str) -> Result<Arc<dyn Kms>> {
        let client_key = account.client_key(password)?;
        Ok(account.unlock_staff_kms(&client_key, &self.connector)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subjects
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a subject bound to `(context_key, context_value)` and return
    /// its manager.
    ///
    /// The subject holds no capabilities yet; seed it with
    /// [`GrantManager::staff_grant_to_account`].
    pub async fn create_subject(
        &self,
        context_key: &str,
        context_value: &str,
        public_payload: Vec<u8>,
    ) -> Result<GrantManager> {
        let subject =
            GrantSubject::generate(self.kms.as_ref(), context_key, context_value, public_payload)
                .await?;
        info!(context_key, context_value, "created subject");
        Ok(self.grant_manager(subject))
    }

    /// A manager for an existing subject.
    pub fn grant_manager(&self, subject: GrantSubject) -> GrantManager {
        GrantManager::new(self.table.clone(), subject).with_kdf_params(self.config.kdf)
    }

    /// Rotate a subject's keys. Every existing capability is orphaned.
    pub async fn rotate_subject(&self, subject: &mut GrantSubject) -> Result<()> {
        subject.regenerate(self.kms.as_ref()).await?;
        info!("rotated subject");
        Ok(())
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
