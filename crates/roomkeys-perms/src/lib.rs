//! # Roomkeys Permissions
//!
//! Capabilities and grant delegation.
//!
//! ## Overview
//!
//! Access to a protected subject (a room's key pair and payload key) is
//! never shared as a raw secret. Instead each holder receives a
//! [`Capability`]: a record with a deterministic identifier, a public
//! payload, and a private payload only that holder can open.
//!
//! ## Capability Kinds
//!
//! - [`PublicKeyCapability`]: sealed to an account's Curve25519 public key
//! - [`SharedSecretCapability`]: opened with a passcode (Argon2id-stretched)
//!
//! Identifiers are recomputable by the holder from the subject nonce and
//! their own credential, so lookups need no index beyond the id.
//!
//! ## Delegation
//!
//! [`GrantManager`] lets a manager who can open their own capability grant
//! or revoke capabilities for other accounts and passcodes. Revocation
//! deletes the holder's capability; rotating the subject with
//! [`GrantSubject::regenerate`] orphans every capability at once.

pub mod account;
pub mod capability;
pub mod error;
pub mod grant;
pub mod public_key;
pub mod shared_secret;
pub mod subject;
pub mod table;

#[cfg(test)]
mod testing;

pub use account::Account;
pub use capability::{Capability, CapabilityKind};
pub use error::{PermsError, Result};
pub use grant::{Authority, GrantManager};
pub use public_key::PublicKeyCapability;
pub use shared_secret::SharedSecretCapability;
pub use subject::{GrantSubject, SubjectSecret};
pub use table::CapabilityTable;
