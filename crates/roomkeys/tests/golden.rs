//! Golden vectors for stored key formats.
//!
//! Every implementation that reads Roomkeys data must produce identical:
//! - AES-CBC ciphertext for the NIST vectors
//! - local KMS context IV
//! - local KMS `mac || ciphertext` blob

use roomkeys::core::{KeyType, ManagedKey};
use roomkeys::kms::{Kms, KmsError, LocalKms};
use roomkeys_testkit::vectors::{cbc_vectors, kms_vectors, verify_all_vectors, wrap_kms_vector};

#[test]
fn test_vectors_verify() {
    let results = verify_all_vectors();
    assert_eq!(results.len(), cbc_vectors().len() + kms_vectors().len());
    for (name, matches, computed) in results {
        assert!(matches, "vector '{}' computed {}", name, computed);
    }
}

#[test]
fn test_kms_vectors_deterministic() {
    for vector in kms_vectors() {
        assert_eq!(wrap_kms_vector(&vector), wrap_kms_vector(&vector));
    }
}

#[test]
fn print_golden_vectors_json() {
    let vectors: Vec<_> = kms_vectors()
        .iter()
        .map(|v| {
            let (iv, blob) = wrap_kms_vector(v);
            serde_json::json!({
                "name": v.name,
                "master_key": v.master_key,
                "key_type": v.key_type.as_str(),
                "plaintext": v.plaintext,
                "context_key": v.context_key,
                "context_value": v.context_value,
                "iv": iv,
                "blob": blob,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&vectors).unwrap());
}

#[tokio::test]
async fn test_zero_master_context_scenario() {
    let kms = LocalKms::new(&[0u8; 32]).unwrap();

    let key = kms
        .generate_encrypted_key(KeyType::Aes128, "room", "R1")
        .await
        .unwrap();
    let decrypted = kms.decrypt_key(&key).await.unwrap();
    assert_eq!(decrypted.plaintext().unwrap().len(), 16);

    let moved = key.with_context("room", "R2");
    let err = kms.decrypt_key(&moved).await.unwrap_err();
    assert!(matches!(err, KmsError::InvalidKey));
}

#[tokio::test]
async fn test_other_master_cannot_unwrap() {
    let kms = LocalKms::new(&[0u8; 32]).unwrap();
    let other = LocalKms::new(&[1u8; 32]).unwrap();
    let key = ManagedKey::generate(KeyType::Aes256);

    let wrapped = kms.wrap_key(&key, "room", "R1").unwrap();
    assert!(other.decrypt_key(&wrapped).await.is_err());
}
