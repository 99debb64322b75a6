//! Loader configuration

use core_runtime::config::{PlaybackSettings, DEFAULT_METADATA_TIMEOUT, DEFAULT_VOLUME};
use std::time::Duration;

/// Tunables for [`PlaybackLoader`](super::PlaybackLoader).
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Upper bound on waiting for the transport to report duration (default: 2s)
    pub metadata_timeout: Duration,

    /// Refresh provider credentials once on `Unauthorized` and retry (default: true)
    pub refresh_auth_on_unauthorized: bool,

    /// Volume applied to the transport before the first command (default: 0.8)
    pub default_volume: f32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            refresh_auth_on_unauthorized: true,
            default_volume: DEFAULT_VOLUME,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    pub fn with_auth_refresh(mut self, enabled: bool) -> Self {
        self.refresh_auth_on_unauthorized = enabled;
        self
    }

    pub fn with_default_volume(mut self, volume: f32) -> Self {
        self.default_volume = volume;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_volume.is_finite() || !(0.0..=1.0).contains(&self.default_volume) {
            return Err(format!(
                "default_volume must be between 0.0 and 1.0, got {}",
                self.default_volume
            ));
        }

        Ok(())
    }
}

impl From<&PlaybackSettings> for LoaderConfig {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            metadata_timeout: settings.metadata_timeout,
            refresh_auth_on_unauthorized: settings.refresh_auth_on_unauthorized,
            default_volume: settings.default_volume,
        }
    }
}
