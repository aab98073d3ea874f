//! Injected observability for the adaptive cache layers: a recorder trait the
//! caches call into, an atomic-counter implementation, plain snapshots, and a
//! text exporter for teardown reports. Never a global singleton.

pub mod exporter;
pub mod recorder;
pub mod snapshot;

pub use exporter::{MetricsExporter, TextReportExporter};
pub use recorder::{AtomicCacheMetrics, CacheMetricsRecorder};
pub use snapshot::CacheMetricsSnapshot;
