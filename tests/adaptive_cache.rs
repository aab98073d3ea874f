// ==============================================
// ADAPTIVE / BLOCK / POINT CACHE SEMANTICS (integration)
// ==============================================
//
// Ghost-hit reporting and charge-proportional capacity rebalancing across
// the adaptive compositions. Sub-caches are built single-shard so capacity
// splits are exact and the scenarios stay deterministic.

use std::sync::Arc;

use adacache::adaptive::AdaptiveCache;
use adacache::block::BlockCache;
use adacache::lru::ShardedLruCache;
use adacache::metrics::{AtomicCacheMetrics, CacheMetricsRecorder};
use adacache::point::PointCache;
use adacache::traits::{AdaptiveLookup, Cache};

fn single_shard_adaptive(real_capacity: usize, ghost_capacity: usize) -> AdaptiveCache<u64> {
    AdaptiveCache::from_parts(
        ShardedLruCache::with_shard_bits(real_capacity, 0),
        ShardedLruCache::with_shard_bits(ghost_capacity, 0),
    )
}

fn insert_released(cache: &AdaptiveCache<u64>, key: &[u8], value: u64, charge: usize) {
    let handle = cache.insert(key, value, charge, None);
    cache.release(handle);
}

// ==============================================
// Ghost Hit Reporting
// ==============================================

#[test]
fn evicted_key_reports_its_original_charge() {
    let cache = single_shard_adaptive(2, 64);
    insert_released(&cache, b"a", 1, 5);
    insert_released(&cache, b"b", 2, 1);
    insert_released(&cache, b"c", 3, 1);

    match cache.lookup_adaptive(b"a") {
        AdaptiveLookup::GhostHit(charge) => assert_eq!(charge, 5),
        other => panic!("expected ghost hit, got {:?}", other),
    }
}

#[test]
fn ghost_hit_returns_no_handle_and_key_stays_evicted() {
    let cache = single_shard_adaptive(1, 64);
    insert_released(&cache, b"a", 1, 1);
    insert_released(&cache, b"b", 2, 1);

    assert_eq!(cache.lookup_adaptive(b"a").ghost_charge(), Some(1));
    // A ghost hit does not resurrect the entry.
    assert_eq!(cache.lookup_adaptive(b"a").ghost_charge(), Some(1));
    assert_eq!(cache.total_real_charge(), 1);
}

#[test]
fn reinserting_after_ghost_hit_serves_real_hits_again() {
    let cache = single_shard_adaptive(1, 64);
    insert_released(&cache, b"a", 1, 1);
    insert_released(&cache, b"b", 2, 1);
    assert!(cache.lookup_adaptive(b"a").ghost_charge().is_some());

    insert_released(&cache, b"a", 10, 1);
    match cache.lookup_adaptive(b"a") {
        AdaptiveLookup::Hit(handle) => {
            assert_eq!(cache.value(&handle), 10);
            cache.release(handle);
        }
        other => panic!("expected hit, got {:?}", other),
    }
}

#[test]
fn charges_split_across_real_and_ghost_layers() {
    let cache = single_shard_adaptive(2, 64);
    insert_released(&cache, b"a", 1, 1);
    insert_released(&cache, b"b", 2, 1);
    insert_released(&cache, b"c", 3, 1);

    assert_eq!(cache.total_real_charge(), 2);
    // One evicted key, recorded at ghost charge 1.
    assert_eq!(cache.total_ghost_charge(), 1);
    assert_eq!(cache.total_charge(), 3);
}

// ==============================================
// Capacity Rebalancing
// ==============================================

#[test]
fn accumulated_small_deltas_flush_once_over_threshold() {
    let cache = single_shard_adaptive(1 << 20, 1 << 20);
    insert_released(&cache, b"r", 0, 100);

    let real_before = cache.real_cache().capacity();
    // 41 × 100 = 4100 > 4096 on the 41st call, which flushes only that
    // call's delta (100, all to real: the ghost layer is empty).
    for _ in 0..41 {
        cache.adjust_capacity(100);
    }
    assert_eq!(cache.real_cache().capacity(), real_before + 100);
}

#[test]
fn flushed_delta_splits_by_ghost_to_real_ratio() {
    let cache = single_shard_adaptive(1 << 20, 1 << 20);
    insert_released(&cache, b"r", 0, 300);
    for key in [b"x", b"y", b"z"] {
        let ghost_handle = cache.ghost_cache().insert(key, 1, 100, None);
        cache.ghost_cache().release(ghost_handle);
    }
    // ghost 300 / real 300 → ratio 1: an even split.
    let real_before = cache.real_cache().capacity();
    let ghost_before = cache.ghost_cache().capacity();
    cache.adjust_capacity(10_000);

    assert_eq!(cache.real_cache().capacity(), real_before + 5000);
    assert_eq!(cache.ghost_cache().capacity(), ghost_before + 5000);
}

#[test]
fn negative_deltas_respect_the_shrink_floor() {
    // Both layers sit far below the 2 MiB adjustable floor, so a negative
    // flush is ignored by the sharded layer.
    let cache = single_shard_adaptive(1 << 10, 1 << 10);
    insert_released(&cache, b"r", 0, 10);

    let before = (cache.real_cache().capacity(), cache.ghost_cache().capacity());
    cache.adjust_capacity(-8192);
    assert_eq!(
        (cache.real_cache().capacity(), cache.ghost_cache().capacity()),
        before
    );
}

// ==============================================
// Block Cache Delegation
// ==============================================

#[test]
fn block_cache_round_trips_and_reports_ghosts() {
    let block = BlockCache::from_adaptive(single_shard_adaptive(2, 64));
    for (key, charge) in [(&b"a"[..], 2usize), (b"b", 1), (b"c", 1)] {
        let handle = block.insert(key, 0, charge, None);
        block.release(handle);
    }

    assert_eq!(block.lookup_adaptive(b"a").ghost_charge(), Some(2));
    match block.lookup_adaptive(b"c") {
        AdaptiveLookup::Hit(handle) => block.release(handle),
        other => panic!("expected hit, got {:?}", other),
    }
    assert_eq!(block.total_charge(), block.total_real_charge() + block.total_ghost_charge());
}

// ==============================================
// Point Cache Planes
// ==============================================

#[test]
fn point_cache_ghost_signals_are_per_plane() {
    let point: PointCache<u64, u64> = PointCache::from_parts(
        single_shard_adaptive(1, 64),
        single_shard_adaptive(1 << 16, 64),
    );

    let handle = point.insert_kv(b"k", 1, 1, None);
    point.release_kv(handle);
    let handle = point.insert_kv(b"k2", 2, 1, None);
    point.release_kv(handle);

    // KV plane evicted "k"; the KP plane never saw it.
    assert_eq!(point.lookup_kv(b"k").ghost_charge(), Some(1));
    assert!(matches!(point.lookup_kp(b"k"), AdaptiveLookup::Miss));
}

#[test]
fn point_cache_new_ids_are_plane_scoped() {
    let point: PointCache<u64, u64> = PointCache::new(1 << 20);
    let kv_id = point.kv_cache().new_id();
    let kp_id = point.kp_cache().new_id();
    // Each plane runs its own generator.
    assert_eq!(kv_id, 1);
    assert_eq!(kp_id, 1);
}

// ==============================================
// Metrics Observation
// ==============================================

#[test]
fn recorder_sees_hits_misses_and_ghost_hits() {
    let metrics = Arc::new(AtomicCacheMetrics::new());
    let cache = single_shard_adaptive(1, 64)
        .with_metrics(Arc::clone(&metrics) as Arc<dyn CacheMetricsRecorder>);

    insert_released(&cache, b"a", 1, 1);
    insert_released(&cache, b"b", 2, 1);

    if let AdaptiveLookup::Hit(handle) = cache.lookup_adaptive(b"b") {
        cache.release(handle);
    }
    let _ = cache.lookup_adaptive(b"a"); // ghost hit
    let _ = cache.lookup_adaptive(b"zz"); // cold miss
    cache.sample_usage();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.inserts, 2);
    assert_eq!(snapshot.hits, 1);
    assert_eq!(snapshot.ghost_hits, 1);
    assert_eq!(snapshot.misses, 1);
    assert_eq!(snapshot.usage_samples, 1);
    assert!((snapshot.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
}
