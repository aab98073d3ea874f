// ==============================================
// METRICS SINK TESTS (integration)
// ==============================================
//
// The recorder is injected, never global; snapshots and the text exporter
// are exercised the way an engine would at teardown.

use std::io::Write;
use std::sync::{Arc, Mutex};

use adacache::builder::CacheBuilder;
use adacache::metrics::{
    AtomicCacheMetrics, CacheMetricsRecorder, MetricsExporter, TextReportExporter,
};
use adacache::point::PointCache;
use adacache::traits::{AdaptiveLookup, Cache};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn teardown_report_reflects_block_cache_activity() {
    let metrics = Arc::new(AtomicCacheMetrics::new());
    let cache = CacheBuilder::new(1 << 16)
        .metrics(Arc::clone(&metrics) as Arc<dyn CacheMetricsRecorder>)
        .try_build_block::<u64>()
        .unwrap();

    for i in 0..8u32 {
        let handle = cache.insert(&i.to_le_bytes(), u64::from(i), 16, None);
        cache.release(handle);
    }
    for i in 0..8u32 {
        if let AdaptiveLookup::Hit(handle) = cache.lookup_adaptive(&i.to_le_bytes()) {
            cache.release(handle);
        }
    }
    let _ = cache.lookup_adaptive(b"cold");
    cache.sample_usage();

    let buf = SharedBuf::default();
    let exporter = TextReportExporter::new(buf.clone());
    exporter.export("block-cache", &metrics.snapshot());

    let report = buf.contents();
    assert!(report.contains("block-cache report"));
    assert!(report.contains("lookups = 9"));
    assert!(report.contains("inserts = 8"));
    assert!(report.contains("miss rate = 0.1111"));
}

#[test]
fn point_cache_planes_share_one_recorder() {
    let metrics = Arc::new(AtomicCacheMetrics::new());
    let point: PointCache<u64, u64> = CacheBuilder::new(1 << 18)
        .metrics(Arc::clone(&metrics) as Arc<dyn CacheMetricsRecorder>)
        .try_build_point()
        .unwrap();

    let handle = point.insert_kv(b"k", 1, 8, None);
    point.release_kv(handle);
    let handle = point.insert_kp(b"k", 2, 1, None);
    point.release_kp(handle);

    // Both planes feed the same counters.
    assert_eq!(metrics.snapshot().inserts, 2);
}

#[test]
fn exporter_appends_one_block_per_flush() {
    let buf = SharedBuf::default();
    let exporter = TextReportExporter::new(buf.clone());
    let metrics = AtomicCacheMetrics::new();

    exporter.export("kv", &metrics.snapshot());
    metrics.record_insert();
    exporter.export("kv", &metrics.snapshot());

    let report = buf.contents();
    assert_eq!(report.matches("kv report").count(), 2);
    assert!(report.contains("inserts = 0"));
    assert!(report.contains("inserts = 1"));
}
