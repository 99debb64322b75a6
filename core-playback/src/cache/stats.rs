//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate over every metadata entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total bytes used by cached audio
    pub size_bytes: u64,

    /// Number of cached tracks
    pub count: usize,
}

impl CacheStats {
    /// Calculate cache usage as a percentage of max size.
    pub fn usage_percentage(&self, max_size: u64) -> f64 {
        if max_size == 0 {
            return 0.0;
        }

        (self.size_bytes as f64 / max_size as f64) * 100.0
    }

    /// Returns true if the cache is near capacity (>90%).
    pub fn is_near_capacity(&self, max_size: u64) -> bool {
        self.usage_percentage(max_size) > 90.0
    }

    /// Returns true if the cache is full (>=100%).
    pub fn is_full(&self, max_size: u64) -> bool {
        self.size_bytes >= max_size
    }

    /// Bytes that must be freed to get back under `max_size`.
    pub fn space_needed(&self, max_size: u64) -> u64 {
        self.size_bytes.saturating_sub(max_size)
    }

    /// Returns average bytes per track.
    pub fn average_entry_size(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.size_bytes / self.count as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Snapshot of cache activity since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub evictions: u64,
}

impl CacheCounters {
    /// Number of audio lookups, hit or miss.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage of lookups.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            return 0.0;
        }

        (self.hits as f64 / lookups as f64) * 100.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct CounterCells {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
    evictions: AtomicU64,
}

impl CounterCells {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_helpers() {
        let stats = CacheStats {
            size_bytes: 950,
            count: 5,
        };

        assert_eq!(stats.usage_percentage(1000), 95.0);
        assert!(stats.is_near_capacity(1000));
        assert!(!stats.is_full(1000));
        assert_eq!(stats.space_needed(900), 50);
        assert_eq!(stats.space_needed(2000), 0);
        assert_eq!(stats.average_entry_size(), 190);
        assert_eq!(stats.usage_percentage(0), 0.0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = CacheStats::default();
        assert!(stats.is_empty());
        assert_eq!(stats.average_entry_size(), 0);
    }

    #[test]
    fn test_counter_snapshot() {
        let cells = CounterCells::default();
        cells.hit();
        cells.hit();
        cells.miss();
        cells.write();
        cells.eviction();

        let counters = cells.snapshot();
        assert_eq!(counters.lookups(), 3);
        assert_eq!(counters.writes, 1);
        assert_eq!(counters.write_failures, 0);
        assert_eq!(counters.evictions, 1);
        assert!((counters.hit_rate() - 66.666).abs() < 0.01);
    }
}
