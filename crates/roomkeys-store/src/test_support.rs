use roomkeys_core::CapabilityId;
use roomkeys_perms::{Capability, SharedSecretCapability};

/// A distinct, opaque capability for storage tests.
pub(crate) fn capability(n: u8) -> Capability {
    Capability::SharedSecret(SharedSecretCapability {
        id: CapabilityId::from_raw(&[n; 32]),
        public_payload: vec![n],
        encrypted_private_payload: vec![n; 16],
    })
}
