//! Proptest generators for property-based testing.

use proptest::prelude::*;

use roomkeys_core::{KeyType, ManagedKey, SubjectNonce, NONCE_SIZE};

/// Generate a key type.
pub fn key_type() -> impl Strategy<Value = KeyType> {
    prop_oneof![Just(KeyType::Aes128), Just(KeyType::Aes256)]
}

/// Generate a decrypted key of the given type.
pub fn managed_key(key_type: KeyType) -> impl Strategy<Value = ManagedKey> {
    prop::collection::vec(any::<u8>(), key_type.key_size())
        .prop_map(move |bytes| ManagedKey::from_plaintext(key_type, bytes).unwrap())
}

/// Generate a decrypted key of either type.
pub fn any_managed_key() -> impl Strategy<Value = ManagedKey> {
    key_type().prop_flat_map(managed_key)
}

/// Generate a subject nonce.
pub fn subject_nonce() -> impl Strategy<Value = SubjectNonce> {
    any::<[u8; NONCE_SIZE]>().prop_map(SubjectNonce::from_bytes)
}

/// Generate a passcode a person might type.
pub fn passcode() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 !@#$%^&*]{1,32}".prop_map(String::from)
}

/// Generate a context key or value.
pub fn context_part() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{0,24}".prop_map(String::from)
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for wrapping a key under a context.
#[derive(Debug, Clone)]
pub struct WrapParams {
    pub key_type: KeyType,
    pub plaintext: Vec<u8>,
    pub context_key: String,
    pub context_value: String,
}

impl WrapParams {
    /// The decrypted key these parameters describe.
    pub fn key(&self) -> ManagedKey {
        ManagedKey::from_plaintext(self.key_type, self.plaintext.clone()).unwrap()
    }
}

impl Arbitrary for WrapParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (any_managed_key(), context_part(), context_part())
            .prop_map(|(key, context_key, context_value)| WrapParams {
                key_type: key.key_type,
                plaintext: key.plaintext().unwrap_or_default().to_vec(),
                context_key,
                context_value,
            })
            .boxed()
    }
}
