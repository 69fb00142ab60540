// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the secret-handling paths in locker-security:
// master password hashing, cache sealing, and last-used cache access.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use locker_core::types::{CredentialRecord, SiteIdentity};
use locker_security::{CacheSealer, LastUsedCache, make_key_hash};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// 100k PBKDF2 iterations dominate this one, so keep the sample small.
fn bench_key_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("master_key");
    group.sample_size(10);
    group.bench_function("make_key_hash", |b| {
        b.iter(|| black_box(make_key_hash(black_box("correct horse"), "user@example.com")));
    });
    group.finish();
}

fn bench_seal_roundtrip(c: &mut Criterion) {
    let sealer = CacheSealer::new(b"account secret").expect("sealer");
    let plaintext = vec![0x42u8; 512];

    c.bench_function("seal_open_roundtrip (512 B)", |b| {
        b.iter(|| {
            let sealed = sealer
                .encrypt(black_box(&plaintext), b"site")
                .expect("encrypt failed");
            let opened = sealer.decrypt(&sealed, b"site").expect("decrypt failed");
            black_box(opened);
        });
    });
}

/// The lookup every fill request makes before deciding to show the unlock
/// dataset.
fn bench_cache_lookup(c: &mut Criterion) {
    let cache = LastUsedCache::open_in_memory(b"account secret").expect("open");
    let site = SiteIdentity::for_web("https", "example.com", None);
    let record = CredentialRecord {
        id: "1".into(),
        username: "a@b.com".into(),
        password: "p".into(),
        display_name: "Example".into(),
        uri: "https://example.com".into(),
        last_used_at: None,
    };
    cache.put(&site, &record).expect("put");

    c.bench_function("last_used_lookup", |b| {
        b.iter(|| black_box(cache.get(black_box(&site)).expect("get failed")));
    });
}

criterion_group!(benches, bench_key_hash, bench_seal_roundtrip, bench_cache_lookup);
criterion_main!(benches);
