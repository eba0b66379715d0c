//! Grant delegation over a protected subject.
//!
//! A manager proves authority by opening their own capability; the
//! recovered subject secret is then resealed for the new holder. Staff
//! grants skip the authority check and go through the KMS instead.

use std::sync::Arc;

use tracing::{debug, info, warn};

use roomkeys_core::{CapabilityId, KdfParams, ManagedKey, ManagedKeyPair};
use roomkeys_kms::Kms;

use crate::account::Account;
use crate::capability::Capability;
use crate::error::{PermsError, Result};
use crate::public_key::PublicKeyCapability;
use crate::shared_secret::SharedSecretCapability;
use crate::subject::{GrantSubject, SubjectSecret};
use crate::table::CapabilityTable;

/// Decrypted subject material held by a proven manager.
#[derive(Debug)]
pub struct Authority {
    /// The subject key pair, decrypted.
    pub key_pair: ManagedKeyPair,
    /// The subject's public payload.
    pub public_payload: Vec<u8>,
    /// The subject's payload key, decrypted.
    pub payload_key: ManagedKey,
}

impl Authority {
    fn secret(&self) -> Result<SubjectSecret> {
        SubjectSecret::from_keys(&self.key_pair, &self.payload_key)
    }
}

/// Grants and revokes capabilities for one subject.
pub struct GrantManager {
    table: Arc<dyn CapabilityTable>,
    subject: GrantSubject,
    kdf: KdfParams,
}

impl GrantManager {
    pub fn new(table: Arc<dyn CapabilityTable>, subject: GrantSubject) -> Self {
        Self {
            table,
            subject,
            kdf: KdfParams::default(),
        }
    }

    /// Use non-default passcode stretching parameters.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn subject(&self) -> &GrantSubject {
        &self.subject
    }

    /// Identifier of the capability `holder` (decrypted) would hold.
    pub fn capability_for_account(&self, holder: &ManagedKeyPair) -> Result<CapabilityId> {
        PublicKeyCapability::compute_id(
            &self.subject.nonce,
            holder,
            &self.subject.key_pair.public_key,
        )
    }

    /// Identifier of the capability a passcode would open.
    pub fn capability_for_passcode(&self, passcode: &str) -> Result<CapabilityId> {
        let key = SharedSecretCapability::passcode_key(passcode, &self.subject.nonce, &self.kdf)?;
        SharedSecretCapability::compute_id(&self.subject.nonce, &key)
    }

    /// Prove that `manager` holds a capability and recover the subject.
    pub async fn authority(
        &self,
        manager: &dyn Account,
        manager_key: &ManagedKey,
    ) -> Result<Authority> {
        let holder = manager.unlock(manager_key)?;
        let id = self.capability_for_account(&holder)?;
        let capability = match self.table.get(&id).await? {
            Some(c) => c.into_public_key()?,
            None => {
                warn!(account = %manager.id(), "no capability for manager");
                return Err(PermsError::AccessDenied(format!(
                    "account {} holds no capability",
                    manager.id()
                )));
            }
        };

        let plaintext = capability.open(&holder, &self.subject.key_pair.public_key)?;
        let authority = self.authority_from(&SubjectSecret::from_bytes(&plaintext)?)?;
        debug!(account = %manager.id(), capability = id.short(), "authority proven");
        Ok(authority)
    }

    /// Open the subject with a passcode.
    pub async fn open_with_passcode(&self, passcode: &str) -> Result<Authority> {
        let key = SharedSecretCapability::passcode_key(passcode, &self.subject.nonce, &self.kdf)?;
        let id = SharedSecretCapability::compute_id(&self.subject.nonce, &key)?;
        let capability = match self.table.get(&id).await? {
            Some(c) => c.into_shared_secret()?,
            None => {
                warn!("no capability for passcode");
                return Err(PermsError::AccessDenied(
                    "passcode holds no capability".to_string(),
                ));
            }
        };

        let plaintext = capability.open(&self.subject.nonce, &key)?;
        self.authority_from(&SubjectSecret::from_bytes(&plaintext)?)
    }

    /// Grant `target` a capability on the manager's authority.
    pub async fn grant_to_account(
        &self,
        manager: &dyn Account,
        manager_key: &ManagedKey,
        target: &dyn Account,
    ) -> Result<CapabilityId> {
        let authority = self.authority(manager, manager_key).await?;
        let id = self.seal_for_account(&authority, target).await?;
        info!(
            manager = %manager.id(),
            target = %target.id(),
            capability = id.short(),
            "granted capability to account"
        );
        Ok(id)
    }

    /// Grant a passcode a capability on the manager's authority.
    pub async fn grant_to_passcode(
        &self,
        manager: &dyn Account,
        manager_key: &ManagedKey,
        passcode: &str,
    ) -> Result<CapabilityId> {
        let authority = self.authority(manager, manager_key).await?;
        let key = SharedSecretCapability::passcode_key(passcode, &self.subject.nonce, &self.kdf)?;
        let capability = SharedSecretCapability::new(
            &self.subject.nonce,
            &key,
            authority.public_payload.clone(),
            &authority.secret()?.to_bytes()?,
        )?;
        let id = capability.id.clone();
        self.table.save(None, &capability.into()).await?;
        info!(
            manager = %manager.id(),
            capability = id.short(),
            "granted capability to passcode"
        );
        Ok(id)
    }

    /// Delete `target`'s capability. The subject key is not rotated.
    pub async fn revoke_from_account(
        &self,
        manager: &dyn Account,
        manager_key: &ManagedKey,
        target: &dyn Account,
    ) -> Result<bool> {
        let authority = self.authority(manager, manager_key).await?;
        let id = PublicKeyCapability::compute_id(
            &self.subject.nonce,
            &authority.key_pair,
            &target.key_pair().public_key,
        )?;
        let removed = self.table.remove(&id).await?;
        info!(
            manager = %manager.id(),
            target = %target.id(),
            capability = id.short(),
            removed,
            "revoked capability from account"
        );
        Ok(removed)
    }

    /// Delete a passcode's capability. The subject key is not rotated.
    pub async fn revoke_from_passcode(
        &self,
        manager: &dyn Account,
        manager_key: &ManagedKey,
        passcode: &str,
    ) -> Result<bool> {
        self.authority(manager, manager_key).await?;
        let id = self.capability_for_passcode(passcode)?;
        let removed = self.table.remove(&id).await?;
        info!(
            manager = %manager.id(),
            capability = id.short(),
            removed,
            "revoked capability from passcode"
        );
        Ok(removed)
    }

    /// Grant `target` a capability by decrypting the subject through the KMS.
    pub async fn staff_grant_to_account(
        &self,
        kms: &dyn Kms,
        target: &dyn Account,
    ) -> Result<CapabilityId> {
        let secret = self.subject.unlock_with_kms(kms).await?;
        let authority = self.authority_from(&secret)?;
        let id = self.seal_for_account(&authority, target).await?;
        info!(target = %target.id(), capability = id.short(), "staff granted capability");
        Ok(id)
    }

    async fn seal_for_account(
        &self,
        authority: &Authority,
        target: &dyn Account,
    ) -> Result<CapabilityId> {
        let capability = PublicKeyCapability::new(
            &self.subject.nonce,
            &authority.key_pair,
            &target.key_pair().public_key,
            authority.public_payload.clone(),
            &authority.secret()?.to_bytes()?,
        )?;
        let id = capability.id.clone();
        self.table
            .save(Some(target.id()), &Capability::from(capability))
            .await?;
        Ok(id)
    }

    fn authority_from(&self, secret: &SubjectSecret) -> Result<Authority> {
        Ok(Authority {
            key_pair: self.subject.restore_key_pair(secret)?,
            public_payload: self.subject.public_payload.clone(),
            payload_key: self.subject.restore_payload_key(secret)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_kdf, MapTable, TestAccount};
    use roomkeys_core::ErrorKind;
    use roomkeys_kms::LocalKms;

    struct Fixture {
        kms: LocalKms,
        table: Arc<MapTable>,
        grants: GrantManager,
        owner: TestAccount,
    }

    /// A subject whose first manager was granted through the KMS.
    async fn fixture() -> Fixture {
        let kms = LocalKms::new(&[0u8; 32]).unwrap();
        let table = Arc::new(MapTable::default());
        let subject = GrantSubject::generate(&kms, "room", "R1", b"lobby".to_vec())
            .await
            .unwrap();
        let grants = GrantManager::new(table.clone(), subject).with_kdf_params(fast_kdf());
        let owner = TestAccount::new("owner");
        grants.staff_grant_to_account(&kms, &owner).await.unwrap();
        Fixture {
            kms,
            table,
            grants,
            owner,
        }
    }

    #[tokio::test]
    async fn test_staff_grant_gives_authority() {
        let f = fixture().await;
        let authority = f.grants.authority(&f.owner, &f.owner.key).await.unwrap();
        assert_eq!(
            authority.key_pair.public_key,
            f.grants.subject().key_pair.public_key
        );
        assert_eq!(authority.public_payload, b"lobby");
        assert_eq!(f.table.len(), 1);
    }

    #[tokio::test]
    async fn test_authority_denied_without_capability() {
        let f = fixture().await;
        let stranger = TestAccount::new("stranger");
        let err = f
            .grants
            .authority(&stranger, &stranger.key)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_grant_to_account_chain() {
        let f = fixture().await;
        let alice = TestAccount::new("alice");
        let bob = TestAccount::new("bob");

        let id = f
            .grants
            .grant_to_account(&f.owner, &f.owner.key, &alice)
            .await
            .unwrap();
        assert_eq!(
            id,
            f.grants
                .capability_for_account(&alice.unlock(&alice.key).unwrap())
                .unwrap()
        );
        assert_eq!(f.table.holder_of(&id), Some(alice.id().clone()));

        // Alice can now delegate in turn.
        f.grants
            .grant_to_account(&alice, &alice.key, &bob)
            .await
            .unwrap();
        let from_bob = f.grants.authority(&bob, &bob.key).await.unwrap();
        let from_owner = f.grants.authority(&f.owner, &f.owner.key).await.unwrap();
        assert_eq!(
            from_bob.payload_key.plaintext(),
            from_owner.payload_key.plaintext()
        );
    }

    #[tokio::test]
    async fn test_grant_to_passcode_and_open() {
        let f = fixture().await;
        f.grants
            .grant_to_passcode(&f.owner, &f.owner.key, "letmein")
            .await
            .unwrap();

        let opened = f.grants.open_with_passcode("letmein").await.unwrap();
        assert_eq!(
            opened.key_pair.public_key,
            f.grants.subject().key_pair.public_key
        );

        let err = f.grants.open_with_passcode("wrong").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_grant_requires_authority() {
        let f = fixture().await;
        let stranger = TestAccount::new("stranger");
        let target = TestAccount::new("target");
        assert!(f
            .grants
            .grant_to_account(&stranger, &stranger.key, &target)
            .await
            .is_err());
        assert!(f
            .grants
            .grant_to_passcode(&stranger, &stranger.key, "pw")
            .await
            .is_err());
        assert_eq!(f.table.len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_manager_key_denied() {
        let f = fixture().await;
        let wrong = ManagedKey::generate(roomkeys_core::KeyType::Aes256);
        let err = f.grants.authority(&f.owner, &wrong).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn test_revoke_from_account() {
        let f = fixture().await;
        let alice = TestAccount::new("alice");
        f.grants
            .grant_to_account(&f.owner, &f.owner.key, &alice)
            .await
            .unwrap();

        assert!(f
            .grants
            .revoke_from_account(&f.owner, &f.owner.key, &alice)
            .await
            .unwrap());
        assert!(f.grants.authority(&alice, &alice.key).await.is_err());

        // Revoking twice is not an error.
        assert!(!f
            .grants
            .revoke_from_account(&f.owner, &f.owner.key, &alice)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_revoke_from_passcode() {
        let f = fixture().await;
        f.grants
            .grant_to_passcode(&f.owner, &f.owner.key, "letmein")
            .await
            .unwrap();
        assert!(f
            .grants
            .revoke_from_passcode(&f.owner, &f.owner.key, "letmein")
            .await
            .unwrap());
        assert!(f.grants.open_with_passcode("letmein").await.is_err());
    }

    #[tokio::test]
    async fn test_regenerated_subject_orphans_capabilities() {
        let f = fixture().await;
        let mut subject = f.grants.subject().clone();
        subject.regenerate(&f.kms).await.unwrap();
        let rotated = GrantManager::new(f.table.clone(), subject).with_kdf_params(fast_kdf());

        assert!(rotated.authority(&f.owner, &f.owner.key).await.is_err());
    }
}
