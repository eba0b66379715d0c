use criterion::{black_box, criterion_group, criterion_main, Criterion};

use roomkeys::{open_message, seal_message};
use roomkeys_core::{derive_key, KeyType, ManagedKey};
use roomkeys_testkit::{fast_kdf, zero_kms};

fn bench_local_kms(c: &mut Criterion) {
    let kms = zero_kms();
    let key = ManagedKey::generate(KeyType::Aes256);
    let wrapped = kms.wrap_key(&key, "room", "R1").unwrap();

    c.bench_function("local_kms_wrap", |b| {
        b.iter(|| kms.wrap_key(black_box(&key), "room", "R1").unwrap())
    });
    c.bench_function("local_kms_unwrap", |b| {
        b.iter(|| kms.unwrap_key(black_box(&wrapped)).unwrap())
    });
}

fn bench_derive_key(c: &mut Criterion) {
    let params = fast_kdf();
    c.bench_function("derive_key_fast", |b| {
        b.iter(|| derive_key(black_box(b"passcode"), &[0u8; 24], KeyType::Aes256, &params).unwrap())
    });
}

fn bench_messages(c: &mut Criterion) {
    let key = ManagedKey::generate(KeyType::Aes256);
    let body = vec![0x61u8; 1024];
    let sealed = seal_message(&key, b"message-id", &body, b"room").unwrap();

    c.bench_function("seal_message_1k", |b| {
        b.iter(|| seal_message(&key, b"message-id", black_box(&body), b"room").unwrap())
    });
    c.bench_function("open_message_1k", |b| {
        b.iter(|| open_message(&key, b"message-id", black_box(&sealed), b"room").unwrap())
    });
}

criterion_group!(benches, bench_local_kms, bench_derive_key, bench_messages);
criterion_main!(benches);
