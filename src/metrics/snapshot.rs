//! Point-in-time view of cache activity counters.

/// Copy of a recorder's counters plus derived rates.
///
/// `*_sum` fields accumulate the values passed to usage samples; the
/// averages divide them by the sample count so the snapshot stays a plain
/// bag of integers.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub ghost_hits: u64,
    pub inserts: u64,

    pub usage_samples: u64,
    pub real_charge_sum: u64,
    pub ghost_charge_sum: u64,
    pub capacity_sum: u64,
}

impl CacheMetricsSnapshot {
    /// Total keyed lookups observed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses + self.ghost_hits
    }

    /// Fraction of lookups served by the real cache; 0 when idle.
    pub fn hit_rate(&self) -> f64 {
        rate(self.hits, self.lookups())
    }

    /// Fraction of lookups that matched only the ghost layer.
    pub fn ghost_hit_rate(&self) -> f64 {
        rate(self.ghost_hits, self.lookups())
    }

    /// Fraction of lookups that missed both layers.
    pub fn miss_rate(&self) -> f64 {
        rate(self.misses, self.lookups())
    }

    /// Mean real-cache charge relative to capacity across usage samples.
    pub fn avg_real_usage(&self) -> f64 {
        rate(self.real_charge_sum, self.capacity_sum)
    }

    /// Mean ghost-cache charge relative to capacity across usage samples.
    pub fn avg_ghost_usage(&self) -> f64 {
        rate(self.ghost_charge_sum, self.capacity_sum)
    }
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
