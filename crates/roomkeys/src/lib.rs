//! # Roomkeys
//!
//! Key management for a chat backend whose rooms can be cryptographically
//! locked.
//!
//! ## Overview
//!
//! Roomkeys provides:
//!
//! - **Accounts**: a Curve25519 key pair per account, unlocked by password,
//!   recoverable through the KMS ([`AccountSecurity`], [`UserAccount`])
//! - **Subjects**: a room's key pair and payload key, protected by a
//!   KMS-wrapped key-encrypting key
//! - **Capabilities**: per-holder grants to a subject, for accounts or
//!   passcodes, managed with a [`GrantManager`]
//! - **Staff access**: a KMS credential sealed to an account
//!   ([`StaffCapability`])
//! - **Messages**: AES-GCM sealing of message content under a room key
//!
//! ## Key Concepts
//!
//! - **Client key**: Argon2id of the password, salted with the account nonce.
//!   Never stored.
//! - **System key**: the account KEK wrapped by the KMS; used only for
//!   password resets and staff grants.
//! - **Authority**: proof that a manager can open their own capability,
//!   required before granting or revoking.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roomkeys::{Keyring, SecurityConfig};
//! use roomkeys::kms::KmsCredential;
//! use roomkeys::store::SqliteCapabilityTable;
//!
//! async fn example() -> roomkeys::Result<()> {
//!     let mut config = SecurityConfig::default();
//!     config.kms.credential = Some(KmsCredential::local(&[0u8; 32]));
//!
//!     let table = Arc::new(SqliteCapabilityTable::open("capabilities.db")?);
//!     let keyring = Keyring::new(config, table)?;
//!
//!     let alice = keyring.register("alice", "correct horse").await?;
//!     let bob = keyring.register("bob", "battery staple").await?;
//!
//!     // A new room, seeded with a capability for its creator.
//!     let room = keyring.create_subject("room", "R1", Vec::new()).await?;
//!     room.staff_grant_to_account(keyring.kms(), &alice).await?;
//!
//!     // Alice shares the room with Bob.
//!     let alice_key = alice.client_key("correct horse")?;
//!     room.grant_to_account(&alice, &alice_key, &bob).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `roomkeys::core` - Key primitives (ManagedKey, ManagedKeyPair, etc.)
//! - `roomkeys::kms` - KMS trait, local and provider-backed implementations
//! - `roomkeys::perms` - Capabilities and grant delegation
//! - `roomkeys::store` - Capability tables (memory and SQLite)

pub mod account;
pub mod config;
pub mod error;
pub mod keyring;
pub mod message;
pub mod security;
pub mod staff;

// Re-export component crates
pub use roomkeys_core as core;
pub use roomkeys_kms as kms;
pub use roomkeys_perms as perms;
pub use roomkeys_store as store;

// Re-export main types for convenience
pub use account::UserAccount;
pub use config::SecurityConfig;
pub use error::{Result, RoomkeysError};
pub use keyring::Keyring;
pub use message::{open_message, seal_message};
pub use security::AccountSecurity;
pub use staff::StaffCapability;

// Re-export commonly used component types
pub use roomkeys_core::{
    AccountId, CapabilityId, ErrorKind, KdfParams, KeyPairType, KeyType, ManagedKey,
    ManagedKeyPair, SubjectNonce,
};
pub use roomkeys_kms::{Kms, KmsConfig, KmsConnector, KmsCredential, LocalKms};
pub use roomkeys_perms::{
    Account, Authority, Capability, CapabilityTable, GrantManager, GrantSubject,
};
