//! # Roomkeys KMS
//!
//! The key management service boundary: randomness plus envelope
//! encryption of [`ManagedKey`](roomkeys_core::ManagedKey) values against a
//! master secret.
//!
//! ## Backends
//!
//! - [`LocalKms`] - master key held in process (development and tests)
//! - [`CloudKms`] - delegates to an external service through [`KmsProvider`]
//!
//! A [`KmsCredential`] describes either backend as JSON, and a
//! [`KmsConnector`] turns it back into an `Arc<dyn Kms>`.

pub mod cloud;
pub mod config;
pub mod credential;
pub mod error;
pub mod kms;
pub mod local;

pub use cloud::{CloudKms, EncryptionContext, KmsProvider, ProviderError};
pub use config::KmsConfig;
pub use credential::{KmsConnector, KmsCredential};
pub use error::{KmsError, Result};
pub use kms::{Kms, NONCE_CONTEXT};
pub use local::LocalKms;
