//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into the shared playback core:
//! one [`EventBus`], one [`AudioCache`] and one [`PlaybackLoader`] bound to the
//! host's media element. Desktop apps typically enable the `desktop-shims`
//! feature, which lets `CoreConfig` fall back to `bridge-desktop` adapters
//! for HTTP, blob URLs and SQLite storage. The `dropbox` feature exposes the
//! Dropbox connector for registering connected accounts.
//!
//! ```ignore
//! use core_service::{bootstrap, CoreConfig, TrackRef};
//!
//! let config = CoreConfig::builder()
//!     .audio_transport(media_element)
//!     .cloud_provider(dropbox)
//!     .cache_dir(app_data_dir)
//!     .build()?;
//!
//! let core = bootstrap(config).await?;
//! core.loader()
//!     .load_track(TrackRef::from_cloud("beat-1", "dropbox", "/Beats/beat-1.mp3"))
//!     .await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_playback::{
    AudioCache, CacheConfig, CacheStats, LoadOutcome, LoadPhase, LoaderConfig, PlaybackLoader,
    PlaybackState, TrackRef,
};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, PlaybackSettings};
pub use core_runtime::events::{CoreEvent, EventBus, Receiver};

#[cfg(feature = "dropbox")]
pub use provider_dropbox::{DropboxConfig, DropboxConnector, DropboxCredentials};

use core_playback::cache::UnavailableStoreOpener;
use core_playback::CloudProviderRegistry;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(feature = "dropbox")]
use bridge_traits::{cloud::CloudAccessProvider, http::HttpClient};

struct ServiceInner {
    settings: PlaybackSettings,
    events: EventBus,
    cache: Arc<AudioCache>,
    loader: PlaybackLoader,
}

/// Primary façade exposed to host applications.
///
/// Clones share the same cache, loader and event bus. The loader is torn
/// down when the last clone is dropped.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Build the cache and loader from `config` without touching storage.
    ///
    /// The cache opens lazily on first use; call [`CoreService::bootstrap`]
    /// to open it eagerly.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let settings = config.playback;
        let events = EventBus::new(settings.event_buffer_size);

        let cache_config = CacheConfig::from(&settings);
        cache_config.validate().map_err(CoreError::Config)?;

        let cache = match config.store_opener {
            Some(opener) => AudioCache::new(opener, cache_config),
            None => {
                warn!("No audio store configured; tracks will not be cached");
                AudioCache::new(Arc::new(UnavailableStoreOpener), cache_config)
            }
        };
        let cache = Arc::new(
            cache
                .with_clock(config.clock.clone())
                .with_event_bus(events.clone()),
        );

        let mut builder = PlaybackLoader::builder()
            .cache(cache.clone())
            .http_client(config.http_client)
            .audio_transport(config.audio_transport)
            .blob_registry(config.blob_registry)
            .providers(CloudProviderRegistry::from_providers(config.cloud_providers))
            .event_bus(events.clone())
            .config(LoaderConfig::from(&settings));

        if let Some(catalog) = config.catalog {
            builder = builder.catalog(catalog);
        }

        let loader = builder.build()?;

        Ok(Self {
            inner: Arc::new(ServiceInner {
                settings,
                events,
                cache,
                loader,
            }),
        })
    }

    /// Build the service and open persistent storage up front.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let service = Self::new(config)?;
        let available = service.inner.cache.init().await;

        info!(
            cache_available = available,
            providers = service.inner.loader.providers().len(),
            "Playback core ready"
        );

        Ok(service)
    }

    pub fn loader(&self) -> &PlaybackLoader {
        &self.inner.loader
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.inner.cache
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Subscribe to playback and cache events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.inner.settings
    }

    /// Stop playback, release the current source and let pending cache
    /// writes finish.
    pub async fn shutdown(&self) {
        self.inner.loader.teardown();
        self.inner.loader.wait_for_background_tasks().await;
        info!("Playback core shut down");
    }
}

/// Convenience wrapper around [`CoreService::bootstrap`].
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    CoreService::bootstrap(config).await
}

/// Build a Dropbox provider ready to be registered with
/// [`CoreConfigBuilder::cloud_provider`].
#[cfg(feature = "dropbox")]
pub fn dropbox_provider(
    http_client: Arc<dyn HttpClient>,
    credentials: DropboxCredentials,
    config: DropboxConfig,
) -> Result<Arc<dyn CloudAccessProvider>> {
    config.validate().map_err(CoreError::Config)?;
    Ok(Arc::new(
        DropboxConnector::new(http_client, credentials).with_config(config),
    ))
}
