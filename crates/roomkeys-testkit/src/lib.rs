//! # Roomkeys Testkit
//!
//! Testing utilities for Roomkeys.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known answers for AES-CBC and the local KMS blob
//!   format, so independent implementations can be checked against each other
//! - **Generators**: Proptest strategies for key types, keys, nonces and
//!   passcodes
//! - **Fixtures**: A keyring over a zero master key and a memory table, with
//!   cheap password stretching
//!
//! ## Golden Vectors
//!
//! ```rust
//! use roomkeys_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, detail) in verify_all_vectors() {
//!     assert!(ok, "{}: {}", name, detail);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use roomkeys_testkit::generators::WrapParams;
//!
//! proptest! {
//!     #[test]
//!     fn wrap_roundtrip(params: WrapParams) {
//!         let kms = roomkeys_testkit::fixtures::zero_kms();
//!         let key = params.key();
//!         let wrapped = kms.wrap_key(&key, &params.context_key, &params.context_value).unwrap();
//!         let unwrapped = kms.unwrap_key(&wrapped).unwrap();
//!         prop_assert_eq!(unwrapped.plaintext(), key.plaintext());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use roomkeys_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let alice = fixture.account("alice").await;
//! let room = fixture.room_owned_by(&alice, "R1").await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fast_kdf, keyring_over, password_for, test_config, zero_kms, TestFixture};
pub use generators::{key_type, managed_key, passcode, subject_nonce, WrapParams};
pub use vectors::{cbc_vectors, kms_vectors, verify_all_vectors, CbcVector, KmsBlobVector};
