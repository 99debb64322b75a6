//! # Audio Cache
//!
//! Process-wide cache of raw audio bytes in front of the cloud fetch.
//!
//! The cache is an optimization, never a correctness dependency. Every public
//! operation absorbs storage errors: reads degrade to a miss, writes to a
//! no-op, and both are logged. The backing store is opened lazily on first use
//! through an [`AudioStoreOpener`]; if the environment has none, the cache
//! stays permanently unavailable and behaves as if it were empty.

use crate::cache::config::CacheConfig;
use crate::cache::memory::UnavailableStoreOpener;
use crate::cache::stats::{CacheCounters, CacheStats, CounterCells};
use crate::error::{PlaybackError, Result};
use bridge_traits::storage::{AudioStore, AudioStoreOpener, StoredAudio, StoredMetadata, StoredWaveform};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_async::sync::OnceCell;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Persistent audio cache with an explicit `init`/`is_available` lifecycle.
pub struct AudioCache {
    config: CacheConfig,
    opener: Arc<dyn AudioStoreOpener>,
    store: OnceCell<Option<Arc<dyn AudioStore>>>,
    clock: Arc<dyn Clock>,
    counters: CounterCells,
    event_bus: Option<EventBus>,
}

impl AudioCache {
    /// Create a cache that opens its store through `opener` on first use.
    pub fn new(opener: Arc<dyn AudioStoreOpener>, config: CacheConfig) -> Self {
        Self {
            config,
            opener,
            store: OnceCell::new(),
            clock: Arc::new(SystemClock),
            counters: CounterCells::default(),
            event_bus: None,
        }
    }

    /// A cache for environments without persistent storage.
    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableStoreOpener), CacheConfig::default())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish [`CacheEvent`]s on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Open the backing store if that hasn't happened yet.
    ///
    /// Concurrent callers share a single open attempt. Returns whether the
    /// cache is usable.
    #[instrument(skip(self))]
    pub async fn init(&self) -> bool {
        self.store().await.is_some()
    }

    /// Whether a persistent store is available. Triggers [`init`](Self::init).
    pub async fn is_available(&self) -> bool {
        self.init().await
    }

    /// Whether the open attempt has already completed (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.store.initialized()
    }

    /// Snapshot of hit/miss/write/eviction counters.
    pub fn counters(&self) -> CacheCounters {
        self.counters.snapshot()
    }

    async fn store(&self) -> Option<Arc<dyn AudioStore>> {
        self.store
            .get_or_init(|| async {
                match self.opener.open().await {
                    Ok(Some(store)) => {
                        info!("Audio cache initialized");
                        Some(store)
                    }
                    Ok(None) => {
                        info!("No persistent storage in this environment; audio cache disabled");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to open audio cache store; caching disabled");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    // ========================================================================
    // Audio
    // ========================================================================

    /// Store or overwrite the audio for `track_id`.
    ///
    /// Failures are logged and otherwise ignored.
    #[instrument(skip(self, data), fields(track_id = %track_id, bytes = data.len()))]
    pub async fn cache_audio(&self, track_id: &str, data: Bytes) {
        let Some(store) = self.store().await else {
            return;
        };

        let size_bytes = data.len() as u64;
        match self.try_cache_audio(store.as_ref(), track_id, data).await {
            Ok(()) => {
                self.counters.write();
                debug!("Cached audio");
                self.emit(CacheEvent::Stored {
                    track_id: track_id.to_string(),
                    size_bytes,
                });
            }
            Err(e) => {
                self.counters.write_failure();
                warn!(error = %e, "Failed to cache audio");
                return;
            }
        }

        if self.config.evict_on_write && self.config.max_cache_size_bytes.is_some() {
            self.evict_over_limit(store.as_ref(), Some(track_id)).await;
        }
    }

    async fn try_cache_audio(&self, store: &dyn AudioStore, track_id: &str, data: Bytes) -> Result<()> {
        let now = self.clock.unix_timestamp_millis();
        let metadata = StoredMetadata {
            last_accessed_at: now,
            size_bytes: data.len() as u64,
        };
        let audio = StoredAudio {
            track_id: track_id.to_string(),
            data,
            stored_at: now,
        };

        store
            .put_audio(audio, metadata)
            .await
            .map_err(|e| PlaybackError::Cache(e.to_string()))
    }

    /// Fetch the cached audio for `track_id`, refreshing its access time.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn get_cached_audio(&self, track_id: &str) -> Option<Bytes> {
        let store = self.store().await?;

        match self.try_get_cached_audio(store.as_ref(), track_id).await {
            Ok(Some(data)) => {
                self.counters.hit();
                debug!(bytes = data.len(), "Cache hit");
                Some(data)
            }
            Ok(None) => {
                self.counters.miss();
                debug!("Cache miss");
                None
            }
            Err(e) => {
                self.counters.miss();
                warn!(error = %e, "Cache read failed; treating as miss");
                None
            }
        }
    }

    async fn try_get_cached_audio(&self, store: &dyn AudioStore, track_id: &str) -> Result<Option<Bytes>> {
        let entry = store
            .get_audio(track_id)
            .await
            .map_err(|e| PlaybackError::Cache(e.to_string()))?;

        let Some(entry) = entry else {
            return Ok(None);
        };

        // A stale access time only skews eviction order.
        if let Err(e) = store
            .touch(track_id, self.clock.unix_timestamp_millis())
            .await
        {
            debug!(error = %e, "Failed to refresh access time");
        }

        Ok(Some(entry.data))
    }

    /// Whether audio for `track_id` is cached. Does not refresh access time.
    pub async fn contains(&self, track_id: &str) -> bool {
        let Some(store) = self.store().await else {
            return false;
        };

        match store.get_metadata(track_id).await {
            Ok(metadata) => metadata.is_some(),
            Err(e) => {
                warn!(track_id, error = %e, "Cache metadata lookup failed");
                false
            }
        }
    }

    // ========================================================================
    // Waveforms
    // ========================================================================

    /// Store waveform samples for `track_id`, clamped to `0.0..=1.0`.
    #[instrument(skip(self, samples), fields(track_id = %track_id, samples = samples.len()))]
    pub async fn cache_waveform(&self, track_id: &str, samples: Vec<f32>) {
        let Some(store) = self.store().await else {
            return;
        };

        let waveform = StoredWaveform {
            track_id: track_id.to_string(),
            samples: normalize_samples(samples),
            stored_at: self.clock.unix_timestamp_millis(),
        };

        if let Err(e) = store.put_waveform(waveform).await {
            warn!(error = %e, "Failed to cache waveform");
        }
    }

    pub async fn get_cached_waveform(&self, track_id: &str) -> Option<Vec<f32>> {
        let store = self.store().await?;

        match store.get_waveform(track_id).await {
            Ok(waveform) => waveform.map(|w| w.samples),
            Err(e) => {
                warn!(track_id, error = %e, "Waveform read failed; treating as miss");
                None
            }
        }
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Delete audio, metadata and waveform for `track_id`. Idempotent.
    #[instrument(skip(self))]
    pub async fn remove_cached_beat(&self, track_id: &str) {
        let Some(store) = self.store().await else {
            return;
        };

        match store.remove(track_id).await {
            Ok(()) => {
                debug!("Removed cached beat");
                self.emit(CacheEvent::Removed {
                    track_id: track_id.to_string(),
                });
            }
            Err(e) => warn!(error = %e, "Failed to remove cached beat"),
        }
    }

    /// Delete every entry. Idempotent.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) {
        let Some(store) = self.store().await else {
            return;
        };

        match store.clear().await {
            Ok(()) => {
                info!("Audio cache cleared");
                self.emit(CacheEvent::Cleared);
            }
            Err(e) => warn!(error = %e, "Failed to clear audio cache"),
        }
    }

    // ========================================================================
    // Statistics & eviction
    // ========================================================================

    /// Total bytes and entry count over all metadata rows.
    pub async fn get_cache_stats(&self) -> CacheStats {
        let Some(store) = self.store().await else {
            return CacheStats::default();
        };

        match store.list_metadata().await {
            Ok(records) => CacheStats {
                size_bytes: records.iter().map(|r| r.metadata.size_bytes).sum(),
                count: records.len(),
            },
            Err(e) => {
                warn!(error = %e, "Failed to compute cache stats");
                CacheStats::default()
            }
        }
    }

    /// Evict least recently accessed entries until the cache fits its cap.
    ///
    /// Returns how many entries were evicted. No-op without a cap.
    #[instrument(skip(self))]
    pub async fn enforce_size_limit(&self) -> usize {
        match self.store().await {
            Some(store) => self.evict_over_limit(store.as_ref(), None).await,
            None => 0,
        }
    }

    async fn evict_over_limit(&self, store: &dyn AudioStore, keep: Option<&str>) -> usize {
        let Some(max_bytes) = self.config.max_cache_size_bytes else {
            return 0;
        };

        match self.try_evict(store, max_bytes, keep).await {
            Ok(evicted) => evicted,
            Err(e) => {
                warn!(error = %e, "Cache eviction failed");
                0
            }
        }
    }

    async fn try_evict(&self, store: &dyn AudioStore, max_bytes: u64, keep: Option<&str>) -> Result<usize> {
        let mut records = store
            .list_metadata()
            .await
            .map_err(|e| PlaybackError::Cache(e.to_string()))?;

        let mut total: u64 = records.iter().map(|r| r.metadata.size_bytes).sum();
        if total <= max_bytes {
            return Ok(0);
        }

        info!(total, max_bytes, "Cache over limit; evicting");
        records.sort_by_key(|r| r.metadata.last_accessed_at);

        let mut evicted = 0;
        for record in records {
            if total <= max_bytes {
                break;
            }
            if keep == Some(record.track_id.as_str()) {
                continue;
            }

            store
                .remove(&record.track_id)
                .await
                .map_err(|e| PlaybackError::Cache(e.to_string()))?;

            total = total.saturating_sub(record.metadata.size_bytes);
            evicted += 1;
            self.counters.eviction();
            debug!(track_id = %record.track_id, size_bytes = record.metadata.size_bytes, "Evicted");
            self.emit(CacheEvent::Evicted {
                track_id: record.track_id,
                size_bytes: record.metadata.size_bytes,
            });
        }

        if total > max_bytes {
            warn!(total, max_bytes, "Cache still over limit after eviction");
        }

        Ok(evicted)
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Cache(event)).ok();
        }
    }
}

impl fmt::Debug for AudioCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioCache")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("counters", &self.counters())
            .finish()
    }
}

fn normalize_samples(samples: Vec<f32>) -> Vec<f32> {
    samples
        .into_iter()
        .map(|s| if s.is_finite() { s.clamp(0.0, 1.0) } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_samples() {
        let samples = normalize_samples(vec![-0.5, 0.25, 1.5, f32::NAN, f32::INFINITY]);
        assert_eq!(samples, vec![0.0, 0.25, 1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_unavailable_cache_degrades() {
        let cache = AudioCache::unavailable();

        assert!(!cache.is_available().await);
        assert!(cache.is_initialized());

        cache.cache_audio("t1", Bytes::from_static(b"abc")).await;
        assert_eq!(cache.get_cached_audio("t1").await, None);
        assert!(!cache.contains("t1").await);
        assert_eq!(cache.get_cache_stats().await, CacheStats::default());
        assert_eq!(cache.enforce_size_limit().await, 0);
        cache.clear_cache().await;
        assert_eq!(cache.counters(), CacheCounters::default());
    }
}
