//! Cache configuration

use core_runtime::config::PlaybackSettings;
use serde::{Deserialize, Serialize};

/// Configuration for [`AudioCache`](super::AudioCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Upper bound on stored audio bytes. `None` leaves the cache unbounded.
    pub max_cache_size_bytes: Option<u64>,

    /// Run eviction after every successful write when a cap is set (default: true)
    pub evict_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size_bytes: None,
            evict_on_write: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum cache size.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_cache_size_bytes = Some(bytes);
        self
    }

    /// Remove the size cap.
    pub fn unbounded(mut self) -> Self {
        self.max_cache_size_bytes = None;
        self
    }

    pub fn with_evict_on_write(mut self, enabled: bool) -> Self {
        self.evict_on_write = enabled;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cache_size_bytes == Some(0) {
            return Err("max_cache_size_bytes must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}

impl From<&PlaybackSettings> for CacheConfig {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            max_cache_size_bytes: settings.max_cache_size_bytes,
            ..Self::default()
        }
    }
}
