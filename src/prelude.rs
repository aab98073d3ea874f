pub use crate::adaptive::AdaptiveCache;
pub use crate::block::BlockCache;
pub use crate::builder::CacheBuilder;
pub use crate::lru::{Handle, ShardedLruCache};
pub use crate::metrics::{AtomicCacheMetrics, CacheMetricsSnapshot, TextReportExporter};
pub use crate::point::PointCache;
pub use crate::traits::{AdaptiveLookup, Cache, Deleter, GhostCache};
