//! Message content sealing.
//!
//! Room messages are sealed with AES-GCM under the room's payload key. The
//! stored form is `base64(tag)/base64(ciphertext)`; the nonce is supplied by
//! the caller (typically derived from the message id) and never stored.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use roomkeys_core::{CoreError, ManagedKey};

use crate::error::Result;

const SEPARATOR: char = '/';

/// Seal `plaintext` under `key`.
pub fn seal_message(
    key: &ManagedKey,
    nonce: &[u8],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<String> {
    let (ciphertext, tag) = key.encrypt_gcm(nonce, plaintext, associated_data)?;
    Ok(format!(
        "{}{}{}",
        BASE64.encode(tag),
        SEPARATOR,
        BASE64.encode(ciphertext)
    ))
}

/// Open a string produced by [`seal_message`].
///
/// A malformed encoding is `MessageCorrupted`; a wrong key, nonce or
/// associated data is `IntegrityFailed`.
pub fn open_message(
    key: &ManagedKey,
    nonce: &[u8],
    sealed: &str,
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let (tag, ciphertext) = sealed
        .split_once(SEPARATOR)
        .ok_or(CoreError::MessageCorrupted)?;
    let tag = BASE64
        .decode(tag)
        .map_err(|_| CoreError::MessageCorrupted)?;
    let ciphertext = BASE64
        .decode(ciphertext)
        .map_err(|_| CoreError::MessageCorrupted)?;

    Ok(key.decrypt_gcm(nonce, &ciphertext, &tag, associated_data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoomkeysError;
    use proptest::prelude::*;
    use roomkeys_core::{ErrorKind, KeyType};

    fn key() -> ManagedKey {
        ManagedKey::generate(KeyType::Aes256)
    }

    #[test]
    fn test_seal_open() {
        let key = key();
        let sealed = seal_message(&key, b"message-1", b"hello room", b"room-1").unwrap();
        assert_eq!(sealed.matches('/').count(), 1);

        let opened = open_message(&key, b"message-1", &sealed, b"room-1").unwrap();
        assert_eq!(opened, b"hello room");
    }

    #[test]
    fn test_wrong_context_fails_integrity() {
        let key = key();
        let sealed = seal_message(&key, b"message-1", b"hello", b"room-1").unwrap();

        let err = open_message(&key, b"message-2", &sealed, b"room-1").unwrap_err();
        assert!(matches!(
            err,
            RoomkeysError::Core(CoreError::IntegrityFailed)
        ));
        assert!(open_message(&key, b"message-1", &sealed, b"room-2").is_err());
        assert!(open_message(&self::key(), b"message-1", &sealed, b"room-1").is_err());
    }

    #[test]
    fn test_malformed_is_corrupted() {
        let key = key();
        for sealed in ["no-separator", "!!!/AAAA", "AAAA/@@@"] {
            let err = open_message(&key, b"n", sealed, b"").unwrap_err();
            assert!(matches!(err, RoomkeysError::Core(CoreError::MessageCorrupted)));
            assert_eq!(err.kind(), ErrorKind::AccessDenied);
        }
    }

    #[test]
    fn test_aes128_key() {
        let key = ManagedKey::generate(KeyType::Aes128);
        let sealed = seal_message(&key, b"n", b"short", b"").unwrap();
        assert_eq!(open_message(&key, b"n", &sealed, b"").unwrap(), b"short");
    }

    proptest! {
        #[test]
        fn prop_seal_open(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = key();
            let sealed = seal_message(&key, b"nonce", &plaintext, b"aad").unwrap();
            prop_assert_eq!(open_message(&key, b"nonce", &sealed, b"aad").unwrap(), plaintext);
        }
    }
}
