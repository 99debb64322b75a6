//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every bridge and setting the cache and loader need. It enforces
//! fail-fast validation so a missing capability is reported at startup with
//! an actionable message instead of surfacing as a silent playback failure.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - streaming-URL requests and audio downloads
//!   (desktop default: reqwest)
//! - `AudioTransport` - the host's media element (always host-provided)
//! - `BlobRegistry` - object URL lifecycle (desktop default: in-memory)
//!
//! ## Optional Dependencies
//!
//! - `AudioStoreOpener` - persistent cache storage; absent means nothing is
//!   cached (desktop default: SQLite under `cache_dir`)
//! - `CloudAccessProvider`s - one per provider tag
//! - `CatalogService` - play counting
//! - `Clock` - defaults to `SystemClock`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .audio_transport(Arc::new(MyMediaElement))
//!     .blob_registry(Arc::new(MyBlobRegistry))
//!     .cloud_provider(Arc::new(dropbox))
//!     .max_cache_size_bytes(2 * 1024 * 1024 * 1024)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AudioStoreOpener, AudioTransport, BlobRegistry, CatalogService, Clock, CloudAccessProvider,
    HttpClient, SystemClock,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on the media-metadata wait.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Default transport volume for a fresh player.
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Playback and cache tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// How long a load waits for the transport to report metadata before
    /// declaring the track ready anyway.
    pub metadata_timeout: Duration,
    /// Total cached bytes allowed before least-recently-used entries are
    /// evicted. `None` disables eviction.
    pub max_cache_size_bytes: Option<u64>,
    /// Refresh credentials and retry once when a provider rejects them.
    pub refresh_auth_on_unauthorized: bool,
    pub event_buffer_size: usize,
    pub default_volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            max_cache_size_bytes: None,
            refresh_auth_on_unauthorized: true,
            event_buffer_size: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
            default_volume: DEFAULT_VOLUME,
        }
    }
}

impl PlaybackSettings {
    pub fn validate(&self) -> Result<()> {
        if self.metadata_timeout.is_zero() {
            return Err(Error::Config(
                "Metadata timeout must be greater than zero".to_string(),
            ));
        }

        if self.metadata_timeout > Duration::from_secs(60) {
            return Err(Error::Config(
                "Metadata timeout exceeds maximum of 60 seconds".to_string(),
            ));
        }

        if self.max_cache_size_bytes == Some(0) {
            return Err(Error::Config(
                "Cache size cap must be greater than 0 bytes; use None to disable eviction"
                    .to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::Config(format!(
                "Default volume {} is outside 0.0..=1.0",
                self.default_volume
            )));
        }

        Ok(())
    }
}

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub audio_transport: Arc<dyn AudioTransport>,
    pub blob_registry: Arc<dyn BlobRegistry>,
    /// Persistent storage probe; `None` disables caching entirely
    pub store_opener: Option<Arc<dyn AudioStoreOpener>>,
    pub cloud_providers: Vec<Arc<dyn CloudAccessProvider>>,
    pub catalog: Option<Arc<dyn CatalogService>>,
    pub clock: Arc<dyn Clock>,
    /// Directory for desktop default storage
    pub cache_dir: Option<PathBuf>,
    pub playback: PlaybackSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: Vec<&str> = self
            .cloud_providers
            .iter()
            .map(|provider| provider.provider_tag())
            .collect();

        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("audio_transport", &"AudioTransport { ... }")
            .field("blob_registry", &"BlobRegistry { ... }")
            .field(
                "store_opener",
                &self
                    .store_opener
                    .as_ref()
                    .map(|_| "AudioStoreOpener { ... }"),
            )
            .field("cloud_providers", &providers)
            .field(
                "catalog",
                &self.catalog.as_ref().map(|_| "CatalogService { ... }"),
            )
            .field("cache_dir", &self.cache_dir)
            .field("playback", &self.playback)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Playback settings are within range
    /// - Each cloud provider tag is registered only once
    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;

        let mut seen = HashSet::new();
        for provider in &self.cloud_providers {
            let tag = provider.provider_tag();
            if tag.is_empty() {
                return Err(Error::Config(
                    "Cloud provider tag cannot be empty".to_string(),
                ));
            }
            if !seen.insert(tag.to_string()) {
                return Err(Error::DuplicateProvider {
                    tag: tag.to_string(),
                });
            }
        }

        Ok(())
    }
}

fn audio_transport_missing_error() -> Error {
    Error::capability_missing(
        "AudioTransport",
        "AudioTransport implementation is required to play audio. \
         Web: wrap the page's HTMLAudioElement. \
         Desktop: inject the host audio engine adapter.",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::capability_missing(
        "HttpClient",
        "HttpClient implementation is required for streaming-URL requests and downloads. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
         Web: inject a fetch-based client.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_blob_registry() -> Result<Arc<dyn BlobRegistry>> {
    Ok(Arc::new(bridge_desktop::InMemoryBlobRegistry::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_blob_registry() -> Result<Arc<dyn BlobRegistry>> {
    Err(Error::capability_missing(
        "BlobRegistry",
        "BlobRegistry implementation is required to hand audio bytes to the transport. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default InMemoryBlobRegistry. \
         Web: wrap URL.createObjectURL / URL.revokeObjectURL.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_store_opener(cache_dir: Option<&PathBuf>) -> Option<Arc<dyn AudioStoreOpener>> {
    use bridge_desktop::SqliteStoreOpener;

    cache_dir.map(|dir| {
        let opener: Arc<dyn AudioStoreOpener> =
            Arc::new(SqliteStoreOpener::new(dir.join("audio-cache.db")));
        opener
    })
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_store_opener(
    _cache_dir: Option<&PathBuf>,
) -> Option<Arc<dyn AudioStoreOpener>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    audio_transport: Option<Arc<dyn AudioTransport>>,
    blob_registry: Option<Arc<dyn BlobRegistry>>,
    store_opener: Option<Arc<dyn AudioStoreOpener>>,
    cloud_providers: Vec<Arc<dyn CloudAccessProvider>>,
    catalog: Option<Arc<dyn CatalogService>>,
    clock: Option<Arc<dyn Clock>>,
    cache_dir: Option<PathBuf>,
    playback: PlaybackSettings,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn audio_transport(mut self, transport: Arc<dyn AudioTransport>) -> Self {
        self.audio_transport = Some(transport);
        self
    }

    pub fn blob_registry(mut self, registry: Arc<dyn BlobRegistry>) -> Self {
        self.blob_registry = Some(registry);
        self
    }

    pub fn store_opener(mut self, opener: Arc<dyn AudioStoreOpener>) -> Self {
        self.store_opener = Some(opener);
        self
    }

    /// Register a cloud provider; its [`provider_tag`](CloudAccessProvider::provider_tag)
    /// must be unique.
    pub fn cloud_provider(mut self, provider: Arc<dyn CloudAccessProvider>) -> Self {
        self.cloud_providers.push(provider);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogService>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Directory used for the desktop SQLite store when no opener is given.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.playback.metadata_timeout = timeout;
        self
    }

    pub fn max_cache_size_bytes(mut self, bytes: u64) -> Self {
        self.playback.max_cache_size_bytes = Some(bytes);
        self
    }

    pub fn refresh_auth_on_unauthorized(mut self, enabled: bool) -> Self {
        self.playback.refresh_auth_on_unauthorized = enabled;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.playback.event_buffer_size = size;
        self
    }

    pub fn default_volume(mut self, volume: f32) -> Self {
        self.playback.default_volume = volume;
        self
    }

    pub fn playback_settings(mut self, settings: PlaybackSettings) -> Self {
        self.playback = settings;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and
    ///   no platform default exists
    /// - [`Error::Config`] / [`Error::DuplicateProvider`] when validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let audio_transport = self
            .audio_transport
            .ok_or_else(audio_transport_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let blob_registry = match self.blob_registry {
            Some(registry) => registry,
            None => provide_default_blob_registry()?,
        };

        let store_opener = self
            .store_opener
            .or_else(|| provide_default_store_opener(self.cache_dir.as_ref()));

        let config = CoreConfig {
            http_client,
            audio_transport,
            blob_registry,
            store_opener,
            cloud_providers: self.cloud_providers,
            catalog: self.catalog,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            cache_dir: self.cache_dir,
            playback: self.playback,
        };

        config.validate()?;

        Ok(config)
    }
}
