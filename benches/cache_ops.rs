use adacache::block::BlockCache;
use adacache::lru::ShardedLruCache;
use adacache::traits::{AdaptiveLookup, Cache};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_lru_insert_lookup(c: &mut Criterion) {
    c.bench_function("sharded_lru_insert_lookup", |b| {
        b.iter_batched(
            || {
                let cache: ShardedLruCache<u64> = ShardedLruCache::new(1 << 20);
                for i in 0..1024u64 {
                    let handle = cache.insert(&i.to_le_bytes(), i, 64, None);
                    cache.release(handle);
                }
                cache
            },
            |cache| {
                for i in 0..1024u64 {
                    let key = std::hint::black_box(i).to_le_bytes();
                    if let Some(handle) = cache.lookup(&key) {
                        let _ = std::hint::black_box(cache.value(&handle));
                        cache.release(handle);
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lru_eviction_churn(c: &mut Criterion) {
    c.bench_function("sharded_lru_eviction_churn", |b| {
        b.iter_batched(
            || ShardedLruCache::<u64>::new(1 << 10),
            |cache| {
                // Unique keys with unit charge keep every insert on the
                // eviction path once the budget is full.
                for i in 0..4096u64 {
                    let key = std::hint::black_box(i).to_le_bytes();
                    let handle = cache.insert(&key, i, 1, None);
                    cache.release(handle);
                }
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_block_cache_adaptive_lookup(c: &mut Criterion) {
    c.bench_function("block_cache_adaptive_lookup", |b| {
        b.iter_batched(
            || {
                let cache: BlockCache<u64> = BlockCache::new(1 << 12);
                for i in 0..4096u64 {
                    let handle = cache.insert(&i.to_le_bytes(), i, 1, None);
                    cache.release(handle);
                }
                cache
            },
            |cache| {
                // Mix of residents, ghosts, and cold keys.
                for i in 0..4096u64 {
                    let key = std::hint::black_box(i * 2).to_le_bytes();
                    match cache.lookup_adaptive(&key) {
                        AdaptiveLookup::Hit(handle) => cache.release(handle),
                        AdaptiveLookup::GhostHit(charge) => {
                            std::hint::black_box(charge);
                        }
                        AdaptiveLookup::Miss => {}
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_lru_insert_lookup,
    bench_lru_eviction_churn,
    bench_block_cache_adaptive_lookup
);
criterion_main!(benches);
