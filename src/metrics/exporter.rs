//! Text report exporter for metrics snapshots.

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use crate::metrics::snapshot::CacheMetricsSnapshot;

/// Publishes snapshots to some external consumer.
pub trait MetricsExporter {
    fn export(&self, label: &str, snapshot: &CacheMetricsSnapshot);
}

/// Appends one human-readable report block per snapshot to a writer,
/// typically an append-mode file flushed at process teardown.
///
/// The exporter measures elapsed wall time from its own construction, so
/// creating it alongside the cache it observes gives per-run timings.
#[derive(Debug)]
pub struct TextReportExporter<W: Write + Send> {
    writer: Mutex<W>,
    started: Instant,
}

impl<W: Write + Send> TextReportExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            started: Instant::now(),
        }
    }
}

impl<W: Write + Send> MetricsExporter for TextReportExporter<W> {
    fn export(&self, label: &str, snapshot: &CacheMetricsSnapshot) {
        let elapsed = self.started.elapsed();
        let mut writer = self
            .writer
            .lock()
            .expect("metrics exporter writer poisoned");
        let _ = writeln!(writer, "---------------------------------------------");
        let _ = writeln!(writer, "{} report, elapsed {:.3}s", label, elapsed.as_secs_f64());
        let _ = writeln!(writer, "lookups = {}", snapshot.lookups());
        let _ = writeln!(writer, "hit rate = {:.4}", snapshot.hit_rate());
        let _ = writeln!(writer, "ghost hit rate = {:.4}", snapshot.ghost_hit_rate());
        let _ = writeln!(writer, "miss rate = {:.4}", snapshot.miss_rate());
        let _ = writeln!(writer, "inserts = {}", snapshot.inserts);
        let _ = writeln!(writer, "avg real usage = {:.4}", snapshot.avg_real_usage());
        let _ = writeln!(writer, "avg ghost usage = {:.4}", snapshot.avg_ghost_usage());
        let _ = writeln!(writer, "---------------------------------------------");
        let _ = writer.flush();
    }
}
