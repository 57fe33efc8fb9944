//! Benchmark the in-memory result cache (LRU with TTL).

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fluentdb::{Cache, MemoryCache, MemoryCacheConfig, Row};
use serde_json::json;

fn rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".into(), json!(i));
            row.insert("name".into(), json!(format!("user{i}")));
            row
        })
        .collect()
}

const TTL: Duration = Duration::from_secs(120);

fn bench_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_cache/hit");

    for capacity in [16, 64, 256, 1024] {
        let cache = MemoryCache::new(MemoryCacheConfig::default().with_capacity(capacity));
        let payload = rows(10);
        for i in 0..capacity {
            cache.set(&format!("key:{i}"), &payload, TTL).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let mut i = 0usize;
            b.iter(|| {
                let key = format!("key:{}", i % cap);
                i += 1;
                black_box(cache.get(&key, Some(TTL)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_insert_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_cache/insert_evict");

    for capacity in [16, 64, 256, 1024] {
        let cache = MemoryCache::new(MemoryCacheConfig::default().with_capacity(capacity));
        let payload = rows(10);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            let mut i = 0usize;
            b.iter(|| {
                cache.set(&format!("key:{i}"), &payload, TTL).unwrap();
                i += 1;
            });
        });
    }

    group.finish();
}

fn bench_payload_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("lru_cache/payload_rows");
    let cache = MemoryCache::default();

    for n in [1, 100, 1099] {
        let payload = rows(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &payload, |b, payload| {
            b.iter(|| {
                cache.set("payload", payload, TTL).unwrap();
                black_box(cache.get("payload", None).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_hit, bench_insert_with_eviction, bench_payload_size);
criterion_main!(benches);
