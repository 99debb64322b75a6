//! # Playback Loader
//!
//! Turns the currently selected track into a playable source on the host's
//! single media element.
//!
//! ## Load lifecycle
//!
//! ```text
//!            select_track()
//!   Idle ──────────────────> Loading ──┬──> Ready
//!                               │      └──> Failed
//!                               │
//!   any state ── select_track(other) / teardown() ──> superseded
//! ```
//!
//! 1. Selection cancels the previous session (pause, detach, revoke its
//!    object URL) and starts a new one with a fresh generation.
//! 2. The cache is consulted first. On a miss the cloud provider mints a
//!    streaming URL and the bytes are downloaded, then persisted in the
//!    background.
//! 3. The bytes are wrapped in an object URL and attached to the transport.
//!    The loader waits for duration metadata, bounded by
//!    [`LoaderConfig::metadata_timeout`], then marks the session ready and
//!    starts playback if the user asked for it while loading.
//!
//! Every state change goes through the session guard, so a session that was
//! superseded mid-flight can never attach a stale source or leak an object URL.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let pending = loader.select_track(TrackRef::from_cloud("b1", "dropbox", "/beats/b1.mp3"));
//! match pending.run().await {
//!     LoadOutcome::Ready { from_cache, .. } => println!("ready (cached: {from_cache})"),
//!     LoadOutcome::Failed(e) => println!("failed: {e}"),
//!     LoadOutcome::Superseded | LoadOutcome::Unchanged => {}
//! }
//! ```

mod config;
mod fetch;
mod session;
mod state;

pub use config::LoaderConfig;
pub use state::{LoadOutcome, LoadPhase, PlaybackState};

use bridge_traits::catalog::CatalogService;
use bridge_traits::cloud::CloudAccessProvider;
use bridge_traits::http::HttpClient;
use bridge_traits::playback::{AudioTransport, BlobRegistry, MediaEvent, PlayFuture};
use bytes::Bytes;
use core_async::task::{spawn_detached, TaskTracker};
use core_async::time::timeout;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::AudioCache;
use crate::cloud::CloudProviderRegistry;
use crate::error::{PlaybackError, Result};
use crate::models::TrackRef;
use fetch::SourceFetcher;
use session::{LoadSession, LoaderInner};

/// Drives the load-session state machine and the transport commands.
///
/// Dropping the loader tears it down.
pub struct PlaybackLoader {
    shared: Arc<Shared>,
}

struct Shared {
    cache: Arc<AudioCache>,
    fetcher: SourceFetcher,
    transport: Arc<dyn AudioTransport>,
    blobs: Arc<dyn BlobRegistry>,
    catalog: Option<Arc<dyn CatalogService>>,
    event_bus: Option<EventBus>,
    config: LoaderConfig,
    inner: Mutex<LoaderInner>,
    background: TaskTracker,
}

/// A started selection whose network and transport work has not run yet.
///
/// Created by [`PlaybackLoader::select_track`]; the state change to loading
/// has already happened when this is returned.
#[must_use = "a pending load does nothing until `run` is awaited or it is spawned"]
pub struct PendingLoad {
    shared: Arc<Shared>,
    work: PendingWork,
}

enum PendingWork {
    Session(LoadSession),
    Done(LoadOutcome),
}

impl PendingLoad {
    /// Generation of the session, or `None` if nothing was started.
    pub fn generation(&self) -> Option<u64> {
        match &self.work {
            PendingWork::Session(session) => Some(session.generation),
            PendingWork::Done(_) => None,
        }
    }

    /// Drive the session to a terminal outcome.
    pub async fn run(self) -> LoadOutcome {
        match self.work {
            PendingWork::Session(session) => self.shared.run_session(session).await,
            PendingWork::Done(outcome) => outcome,
        }
    }
}

impl PlaybackLoader {
    pub fn builder() -> PlaybackLoaderBuilder {
        PlaybackLoaderBuilder::default()
    }

    /// Snapshot of the current playback state.
    pub fn state(&self) -> PlaybackState {
        self.shared.inner.lock().state.clone()
    }

    pub fn phase(&self) -> LoadPhase {
        self.shared.inner.lock().state.phase
    }

    /// Generation of the most recent selection (0 before the first one).
    pub fn current_generation(&self) -> u64 {
        self.shared.inner.lock().generation
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.shared.cache
    }

    pub fn providers(&self) -> &CloudProviderRegistry {
        self.shared.fetcher.providers()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.shared.config
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Make `track` the current selection.
    ///
    /// Cancels the previous session synchronously. Re-selecting the track that
    /// is already loading or ready is a no-op that yields
    /// [`LoadOutcome::Unchanged`].
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub fn select_track(&self, track: TrackRef) -> PendingLoad {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();

        if inner.torn_down {
            debug!("Loader torn down; ignoring selection");
            return shared.finished(LoadOutcome::Superseded);
        }

        if inner.is_serving(&track.id) {
            debug!("Track already current");
            return shared.finished(LoadOutcome::Unchanged);
        }

        let session = inner.begin(track, shared.transport.as_ref(), shared.blobs.as_ref());
        drop(inner);

        info!(generation = session.generation, "Loading track");
        shared.emit(PlaybackEvent::LoadStarted {
            track_id: session.track_id().to_string(),
            generation: session.generation,
        });
        shared.count_play(session.track_id());

        PendingLoad {
            shared: Arc::clone(shared),
            work: PendingWork::Session(session),
        }
    }

    /// Select `track` and drive the load to completion.
    pub async fn load_track(&self, track: TrackRef) -> LoadOutcome {
        self.select_track(track).run().await
    }

    /// Select `track` and drive the load on a background task.
    ///
    /// Returns the new session's generation, or `None` if nothing was started.
    pub fn spawn_load(&self, track: TrackRef) -> Option<u64> {
        let pending = self.select_track(track);
        let generation = pending.generation();
        if generation.is_some() {
            spawn_detached(async move {
                pending.run().await;
            });
        }
        generation
    }

    // ========================================================================
    // Transport commands
    // ========================================================================

    /// Request playback.
    ///
    /// While loading the request is remembered and applied once the session
    /// is ready. Returns the resulting `is_playing`.
    #[instrument(skip(self))]
    pub async fn play(&self) -> bool {
        let (play, generation, track_id) = {
            let mut inner = self.shared.inner.lock();
            match inner.state.phase {
                LoadPhase::Idle | LoadPhase::Failed => {
                    debug!(phase = ?inner.state.phase, "Nothing to play");
                    return false;
                }
                LoadPhase::Loading => {
                    inner.state.is_playing = true;
                    debug!("Play deferred until track is ready");
                    return true;
                }
                LoadPhase::Ready => {
                    if inner.state.is_playing {
                        return true;
                    }
                    inner.state.is_playing = true;
                    let track_id = inner.state.current_track_id.clone().unwrap_or_default();
                    (self.shared.transport.play(), inner.generation, track_id)
                }
            }
        };

        self.shared.await_play(play, generation, track_id).await
    }

    /// Pause playback, or cancel a deferred play request while loading.
    #[instrument(skip(self))]
    pub fn pause(&self) {
        let mut inner = self.shared.inner.lock();
        if !inner.state.is_playing {
            return;
        }

        inner.state.is_playing = false;
        if inner.state.phase == LoadPhase::Ready {
            self.shared.transport.pause();
            let event = PlaybackEvent::Paused {
                track_id: inner.state.current_track_id.clone().unwrap_or_default(),
                position_ms: seconds_to_ms(inner.state.position_seconds),
            };
            drop(inner);
            self.shared.emit(event);
        }
    }

    /// Flip between playing and paused. Returns the new `is_playing`.
    pub async fn toggle_play(&self) -> bool {
        let playing = self.shared.inner.lock().state.is_playing;
        if playing {
            self.pause();
            false
        } else {
            self.play().await
        }
    }

    /// Set the volume, clamped to `0.0..=1.0`. Non-finite values are ignored.
    pub fn set_volume(&self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "Ignoring non-finite volume");
            return;
        }

        let volume = volume.clamp(0.0, 1.0);
        {
            let mut inner = self.shared.inner.lock();
            inner.state.volume = volume;
            self.shared.transport.set_volume(volume);
        }
        self.shared.emit(PlaybackEvent::VolumeChanged {
            volume_percent: (volume * 100.0).round() as u8,
        });
    }

    /// Jump to `position_seconds` within the ready track.
    ///
    /// Ignored unless a track is ready. Returns the applied position.
    pub fn seek(&self, position_seconds: f64) -> Option<f64> {
        if !position_seconds.is_finite() {
            warn!(position_seconds, "Ignoring non-finite seek position");
            return None;
        }

        let mut inner = self.shared.inner.lock();
        if inner.state.phase != LoadPhase::Ready {
            debug!("Seek ignored; no track ready");
            return None;
        }

        let mut position = position_seconds.max(0.0);
        if inner.state.duration_seconds > 0.0 {
            position = position.min(inner.state.duration_seconds);
        }

        self.shared.transport.seek(position);
        inner.state.position_seconds = position;
        let event = PlaybackEvent::Seeked {
            track_id: inner.state.current_track_id.clone().unwrap_or_default(),
            position_ms: seconds_to_ms(position),
        };
        drop(inner);

        self.shared.emit(event);
        Some(position)
    }

    /// Feed a notification from the media element back into the state.
    ///
    /// Must not be called from inside an [`AudioTransport`] command; see the
    /// trait docs.
    pub fn handle_media_event(&self, event: MediaEvent) {
        let mut inner = self.shared.inner.lock();
        if inner.active.is_none() {
            return;
        }

        match event {
            MediaEvent::TimeUpdate { position_seconds } => {
                if inner.state.phase == LoadPhase::Ready && position_seconds.is_finite() {
                    inner.state.position_seconds = position_seconds.max(0.0);
                }
            }
            MediaEvent::LoadedMetadata { duration_seconds } => {
                if duration_seconds.is_finite() && duration_seconds > 0.0 {
                    inner.state.duration_seconds = duration_seconds;
                }
            }
            MediaEvent::Ended => {
                if inner.state.phase != LoadPhase::Ready {
                    return;
                }
                inner.state.is_playing = false;
                let track_id = inner.state.current_track_id.clone().unwrap_or_default();
                drop(inner);

                debug!(track_id = %track_id, "Track ended");
                self.shared.emit(PlaybackEvent::Ended { track_id });
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Cancel the current session and release the transport. Idempotent.
    pub fn teardown(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            return;
        }

        inner.release_active(self.shared.transport.as_ref(), self.shared.blobs.as_ref());
        inner.torn_down = true;
        inner.state.phase = LoadPhase::Idle;
        inner.state.is_loading = false;
        inner.state.is_playing = false;
        debug!("Playback loader torn down");
    }

    /// Wait until detached cache writes and play-count updates have finished.
    pub async fn wait_for_background_tasks(&self) {
        let background = &self.shared.background;
        background.close();
        background.wait().await;
        background.reopen();
    }
}

impl Drop for PlaybackLoader {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for PlaybackLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackLoader")
            .field("state", &self.state())
            .field("generation", &self.current_generation())
            .finish()
    }
}

impl Shared {
    fn finished(self: &Arc<Self>, outcome: LoadOutcome) -> PendingLoad {
        PendingLoad {
            shared: Arc::clone(self),
            work: PendingWork::Done(outcome),
        }
    }

    #[instrument(skip(self, session), fields(track_id = %session.track_id(), generation = session.generation))]
    async fn run_session(&self, session: LoadSession) -> LoadOutcome {
        let Some(cached) = session
            .until_cancelled(self.cache.get_cached_audio(session.track_id()))
            .await
        else {
            return superseded(&session, "cache lookup");
        };

        let (data, from_cache) = match cached {
            Some(data) => (data, true),
            None => match session.until_cancelled(self.fetcher.fetch(&session.track)).await {
                None => return superseded(&session, "fetch"),
                Some(Err(e)) => return self.fail(&session, e),
                Some(Ok(data)) => {
                    self.persist_in_background(&session, data.clone());
                    (data, false)
                }
            },
        };

        match self.attach(&session, data) {
            None => return superseded(&session, "attach"),
            Some(Err(e)) => return self.fail(&session, e),
            Some(Ok(())) => {}
        }

        let duration_seconds = match session
            .until_cancelled(timeout(
                self.config.metadata_timeout,
                self.transport.metadata_ready(),
            ))
            .await
        {
            None => return superseded(&session, "metadata wait"),
            Some(Ok(duration)) => duration.filter(|d| d.is_finite() && *d > 0.0),
            Some(Err(_)) => {
                debug!("Metadata not reported in time; continuing");
                None
            }
        };

        self.finish_ready(session, from_cache, duration_seconds).await
    }

    /// Wrap `data` in an object URL and attach it, if the session is current.
    fn attach(&self, session: &LoadSession, data: Bytes) -> Option<Result<()>> {
        let mime_type = session.track.mime_type_hint();
        session.apply(&self.inner, |inner| {
            let url = self
                .blobs
                .create(data, mime_type)
                .map_err(|e| PlaybackError::BlobCreation(e.to_string()))?;

            self.transport.attach_source(&url);
            if let Some(active) = inner.active_mut() {
                active.blob = Some(url);
            }
            Ok(())
        })
    }

    async fn finish_ready(
        &self,
        session: LoadSession,
        from_cache: bool,
        duration_seconds: Option<f64>,
    ) -> LoadOutcome {
        let started = session.apply(&self.inner, |inner| {
            inner.state.phase = LoadPhase::Ready;
            inner.state.is_loading = false;
            if let Some(duration) = duration_seconds {
                inner.state.duration_seconds = duration;
            }
            inner
                .state
                .is_playing
                .then(|| self.transport.play())
        });

        let Some(play) = started else {
            return superseded(&session, "ready");
        };

        info!(from_cache, ?duration_seconds, "Track ready");
        self.emit(PlaybackEvent::Ready {
            track_id: session.track_id().to_string(),
            from_cache,
            duration_ms: duration_seconds.map(seconds_to_ms),
        });

        if let Some(play) = play {
            self.await_play(play, session.generation, session.track_id().to_string())
                .await;
        }

        LoadOutcome::Ready {
            from_cache,
            duration_seconds,
        }
    }

    /// Await a play attempt, forcing `is_playing` off if the host refuses.
    async fn await_play(&self, play: PlayFuture, generation: u64, track_id: String) -> bool {
        match play.await {
            Ok(()) => {
                self.emit(PlaybackEvent::Playing { track_id });
                true
            }
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Audio transport rejected playback");
                let mut inner = self.inner.lock();
                if inner.is_current(generation) {
                    inner.state.is_playing = false;
                }
                false
            }
        }
    }

    fn fail(&self, session: &LoadSession, error: PlaybackError) -> LoadOutcome {
        let applied = session.apply(&self.inner, |inner| {
            inner.state.phase = LoadPhase::Failed;
            inner.state.is_loading = false;
            inner.state.is_playing = false;
        });

        if applied.is_none() {
            return superseded(session, "failure");
        }

        warn!(error = %error, transient = error.is_transient(), "Track load failed");
        self.emit(PlaybackEvent::LoadFailed {
            track_id: session.track_id().to_string(),
            reason: error.to_string(),
            recoverable: error.is_transient(),
        });
        LoadOutcome::Failed(error)
    }

    /// Write freshly downloaded bytes to the cache without blocking the load.
    ///
    /// Only downloads that completed before cancellation reach this point,
    /// and every one of them is persisted regardless of later selections.
    fn persist_in_background(&self, session: &LoadSession, data: Bytes) {
        let cache = Arc::clone(&self.cache);
        let track_id = session.track_id().to_string();

        spawn_detached(self.background.track_future(async move {
            cache.cache_audio(&track_id, data).await;
        }));
    }

    fn count_play(&self, track_id: &str) {
        let Some(catalog) = self.catalog.clone() else {
            return;
        };
        let track_id = track_id.to_string();

        spawn_detached(self.background.track_future(async move {
            if let Err(e) = catalog.increment_play_count(&track_id).await {
                warn!(track_id = %track_id, error = %e, "Failed to record play");
            }
        }));
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Playback(event)).ok();
        }
    }
}

fn superseded(session: &LoadSession, stage: &str) -> LoadOutcome {
    debug!(
        track_id = %session.track_id(),
        generation = session.generation,
        stage,
        "Discarding superseded load"
    );
    LoadOutcome::Superseded
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

// ============================================================================
// Builder
// ============================================================================

/// Collects the loader's collaborators.
#[derive(Default)]
pub struct PlaybackLoaderBuilder {
    cache: Option<Arc<AudioCache>>,
    http_client: Option<Arc<dyn HttpClient>>,
    transport: Option<Arc<dyn AudioTransport>>,
    blobs: Option<Arc<dyn BlobRegistry>>,
    providers: CloudProviderRegistry,
    catalog: Option<Arc<dyn CatalogService>>,
    event_bus: Option<EventBus>,
    config: LoaderConfig,
}

impl PlaybackLoaderBuilder {
    /// Cache consulted before the network. Defaults to an unavailable cache.
    pub fn cache(mut self, cache: Arc<AudioCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn audio_transport(mut self, transport: Arc<dyn AudioTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn blob_registry(mut self, registry: Arc<dyn BlobRegistry>) -> Self {
        self.blobs = Some(registry);
        self
    }

    pub fn cloud_provider(mut self, provider: Arc<dyn CloudAccessProvider>) -> Self {
        self.providers.register(provider);
        self
    }

    pub fn providers(mut self, providers: CloudProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogService>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PlaybackLoader> {
        self.config.validate().map_err(PlaybackError::InvalidConfig)?;

        let http_client = self
            .http_client
            .ok_or_else(|| PlaybackError::InvalidConfig("HTTP client is required".to_string()))?;
        let transport = self
            .transport
            .ok_or_else(|| PlaybackError::InvalidConfig("audio transport is required".to_string()))?;
        let blobs = self
            .blobs
            .ok_or_else(|| PlaybackError::InvalidConfig("blob registry is required".to_string()))?;
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(AudioCache::unavailable()));

        transport.set_volume(self.config.default_volume);

        let shared = Shared {
            cache,
            fetcher: SourceFetcher::new(
                self.providers,
                http_client,
                self.config.refresh_auth_on_unauthorized,
            ),
            transport,
            blobs,
            catalog: self.catalog,
            event_bus: self.event_bus,
            inner: Mutex::new(LoaderInner::new(self.config.default_volume)),
            config: self.config,
            background: TaskTracker::new(),
        };

        Ok(PlaybackLoader {
            shared: Arc::new(shared),
        })
    }
}
