//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the AES-CBC primitive and the local KMS blob layout
//! (`HMAC-SHA256 || AES-CBC`, IV from the context) so that stored keys stay
//! readable across releases and implementations.

use roomkeys_core::{block_crypt, CryptMode, KeyType, ManagedKey};
use roomkeys_kms::LocalKms;

/// A raw AES-CBC known answer.
#[derive(Debug, Clone)]
pub struct CbcVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Key (hex).
    pub key: &'static str,
    /// IV (hex).
    pub iv: &'static str,
    /// Plaintext (hex), block aligned.
    pub plaintext: &'static str,
    /// Expected ciphertext (hex).
    pub ciphertext: &'static str,
}

/// A local KMS wrapping known answer.
#[derive(Debug, Clone)]
pub struct KmsBlobVector {
    pub name: &'static str,
    /// Master key (hex).
    pub master_key: &'static str,
    pub key_type: KeyType,
    /// Key being wrapped (hex).
    pub plaintext: &'static str,
    pub context_key: &'static str,
    pub context_value: &'static str,
    /// Expected IV stored on the wrapped key (hex).
    pub expected_iv: &'static str,
    /// Expected `mac || ciphertext` blob (hex).
    pub expected_blob: &'static str,
}

const NIST_IV: &str = "000102030405060708090a0b0c0d0e0f";
const NIST_PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51";

/// NIST SP 800-38A CBC vectors (first two blocks).
pub fn cbc_vectors() -> Vec<CbcVector> {
    vec![
        CbcVector {
            name: "CBC-AES128 F.2.1",
            key: "2b7e151628aed2a6abf7158809cf4f3c",
            iv: NIST_IV,
            plaintext: NIST_PLAINTEXT,
            ciphertext: "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2",
        },
        CbcVector {
            name: "CBC-AES256 F.2.5",
            key: "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
            iv: NIST_IV,
            plaintext: NIST_PLAINTEXT,
            ciphertext: "f58c4c04d6e5f1ba779eabfb5f7bfbd69cfc4e967edb808d679f777bc6702c7d",
        },
    ]
}

/// Local KMS blob vectors.
pub fn kms_vectors() -> Vec<KmsBlobVector> {
    vec![KmsBlobVector {
        name: "AES-128 key, zero master, room/R1",
        master_key: "0000000000000000000000000000000000000000000000000000000000000000",
        key_type: KeyType::Aes128,
        plaintext: "01010101010101010101010101010101",
        context_key: "room",
        context_value: "R1",
        expected_iv: "554b345df2d0cab432693df27cce96ab",
        expected_blob: "75ca4472fb9adcaea2f55bcd6dc9edc2a221ca14ae810112b6773096786443f8\
                        7e29491cfce06c7ec0eb1e0e8302bebb",
    }]
}

/// Compute the ciphertext for a CBC vector.
pub fn encrypt_cbc_vector(vector: &CbcVector) -> String {
    let key = hex::decode(vector.key).unwrap();
    let iv = hex::decode(vector.iv).unwrap();
    let mut data = hex::decode(vector.plaintext).unwrap();
    block_crypt(&iv, &key, &mut data, CryptMode::Encrypt).unwrap();
    hex::encode(data)
}

/// Wrap the key of a KMS vector. Returns `(iv, blob)` as hex.
pub fn wrap_kms_vector(vector: &KmsBlobVector) -> (String, String) {
    let kms = LocalKms::new(&hex::decode(vector.master_key).unwrap()).unwrap();
    let key =
        ManagedKey::from_plaintext(vector.key_type, hex::decode(vector.plaintext).unwrap())
            .unwrap();
    let wrapped = kms
        .wrap_key(&key, vector.context_key, vector.context_value)
        .unwrap();
    (
        hex::encode(&wrapped.iv),
        hex::encode(wrapped.ciphertext().unwrap_or_default()),
    )
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, computed)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let cbc = cbc_vectors().into_iter().map(|v| {
        let computed = encrypt_cbc_vector(&v);
        (v.name.to_string(), computed == v.ciphertext, computed)
    });
    let kms = kms_vectors().into_iter().map(|v| {
        let (iv, blob) = wrap_kms_vector(&v);
        let matches = iv == v.expected_iv && blob == v.expected_blob;
        (v.name.to_string(), matches, format!("{}:{}", iv, blob))
    });
    cbc.chain(kms).collect()
}
