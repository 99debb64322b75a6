//! Hand-written fakes for the loader's collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::catalog::CatalogService;
use bridge_traits::cloud::CloudAccessProvider;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::playback::{AudioTransport, BlobRegistry, BlobUrl, MetadataFuture, PlayFuture};
use bytes::Bytes;
use core_playback::cache::{AudioCache, CacheConfig, InMemoryAudioStore, InMemoryStoreOpener};
use core_playback::loader::{LoaderConfig, PlaybackLoader};
use core_playback::TrackRef;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Transport
// ============================================================================

/// How the fake media element answers `metadata_ready`.
#[derive(Debug, Clone, Copy)]
pub enum MetadataMode {
    Immediate(f64),
    Never,
}

#[derive(Debug, Default)]
struct TransportLog {
    attached: Vec<BlobUrl>,
    current: Option<BlobUrl>,
    seeks: Vec<f64>,
    volumes: Vec<f32>,
}

/// Media element that records every command.
pub struct RecordingTransport {
    log: Mutex<TransportLog>,
    metadata: Mutex<MetadataMode>,
    reject_play: AtomicBool,
    plays: AtomicUsize,
    pauses: AtomicUsize,
    detaches: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(TransportLog::default()),
            metadata: Mutex::new(MetadataMode::Immediate(180.0)),
            reject_play: AtomicBool::new(false),
            plays: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
        })
    }

    pub fn set_metadata_mode(&self, mode: MetadataMode) {
        *self.metadata.lock() = mode;
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn attached(&self) -> Vec<BlobUrl> {
        self.log.lock().attached.clone()
    }

    pub fn current_source(&self) -> Option<BlobUrl> {
        self.log.lock().current.clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.log.lock().seeks.clone()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.log.lock().volumes.last().copied()
    }

    pub fn play_calls(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn detach_calls(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl AudioTransport for RecordingTransport {
    fn attach_source(&self, source: &BlobUrl) {
        let mut log = self.log.lock();
        log.attached.push(source.clone());
        log.current = Some(source.clone());
    }

    fn detach_source(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        self.log.lock().current = None;
    }

    fn play(&self) -> PlayFuture {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let rejected = self.reject_play.load(Ordering::SeqCst);
        async move {
            if rejected {
                Err(BridgeError::OperationFailed("NotAllowedError: autoplay blocked".to_string()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn seek(&self, position_seconds: f64) {
        self.log.lock().seeks.push(position_seconds);
    }

    fn set_volume(&self, volume: f32) {
        self.log.lock().volumes.push(volume);
    }

    fn metadata_ready(&self) -> MetadataFuture {
        match *self.metadata.lock() {
            MetadataMode::Immediate(duration) => async move { Some(duration) }.boxed(),
            MetadataMode::Never => futures::future::pending().boxed(),
        }
    }
}

// ============================================================================
// Blob registry
// ============================================================================

/// Object URL registry that counts creations and revocations.
#[derive(Default)]
pub struct CountingBlobRegistry {
    next_id: AtomicUsize,
    live: Mutex<HashSet<BlobUrl>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
    fail_create: AtomicBool,
    payloads: Mutex<HashMap<BlobUrl, Bytes>>,
}

impl CountingBlobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.lock().len()
    }

    /// Bytes handed over when `url` was created.
    pub fn payload(&self, url: &BlobUrl) -> Option<Bytes> {
        self.payloads.lock().get(url).cloned()
    }
}

impl BlobRegistry for CountingBlobRegistry {
    fn create(&self, data: Bytes, _mime_type: Option<&str>) -> Result<BlobUrl> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("out of memory".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let url = BlobUrl::new(format!("blob:test/{}", id));
        self.live.lock().insert(url.clone());
        self.payloads.lock().insert(url.clone(), data);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(url)
    }

    fn revoke(&self, url: &BlobUrl) {
        if self.live.lock().remove(url) {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Cloud provider
// ============================================================================

/// Scripted provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    Unauthorized,
    /// Unauthorized until `refresh_auth` has been called once.
    UnauthorizedUntilRefresh,
    Api,
}

/// Dropbox stand-in whose answers can be held back per file.
#[derive(Default)]
pub struct GatedProvider {
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<String, ProviderFailure>>,
    links: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    refreshes: AtomicUsize,
}

impl GatedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Hold `get_stream_url(file_id)` until [`release`](Self::release).
    pub fn gate(&self, file_id: &str) {
        self.gates
            .lock()
            .insert(file_id.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, file_id: &str) {
        if let Some(gate) = self.gates.lock().get(file_id) {
            gate.notify_one();
        }
    }

    pub fn fail(&self, file_id: &str, failure: ProviderFailure) {
        self.failures.lock().insert(file_id.to_string(), failure);
    }

    /// Answer `get_stream_url(file_id)` with `url` instead of the default link.
    pub fn link(&self, file_id: &str, url: &str) {
        self.links.lock().insert(file_id.to_string(), url.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn url_for(file_id: &str) -> String {
        format!("https://content.example.com/{}?token=short-lived", file_id)
    }
}

#[async_trait]
impl CloudAccessProvider for GatedProvider {
    fn provider_tag(&self) -> &str {
        "dropbox"
    }

    async fn get_stream_url(&self, file_id: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().get(file_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = self.failures.lock().get(file_id).copied();
        match failure {
            Some(ProviderFailure::Unauthorized) => {
                Err(BridgeError::Unauthorized("expired_access_token".to_string()))
            }
            Some(ProviderFailure::UnauthorizedUntilRefresh)
                if self.refreshes.load(Ordering::SeqCst) == 0 =>
            {
                Err(BridgeError::Unauthorized("expired_access_token".to_string()))
            }
            Some(ProviderFailure::Api) => Err(BridgeError::OperationFailed(
                "path/not_found".to_string(),
            )),
            _ => Ok(self
                .links
                .lock()
                .get(file_id)
                .cloned()
                .unwrap_or_else(|| Self::url_for(file_id))),
        }
    }

    async fn refresh_auth(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP client serving `audio:<url>` for every request unless told otherwise.
#[derive(Default)]
pub struct FakeHttp {
    statuses: Mutex<HashMap<String, u16>>,
    bodies: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_with_status(&self, url: &str, status: u16) {
        self.statuses.lock().insert(url.to_string(), status);
    }

    pub fn respond_with_body(&self, url: &str, body: Bytes) {
        self.bodies.lock().insert(url.to_string(), body);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn body_for(url: &str) -> Bytes {
        Bytes::from(format!("audio:{}", url))
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request.url.clone());
        let status = self.statuses.lock().get(&request.url).copied().unwrap_or(200);
        let body = if status == 200 {
            self.bodies
                .lock()
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Self::body_for(&request.url))
        } else {
            Bytes::new()
        };

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct RecordingCatalog {
    plays: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn plays(&self) -> Vec<String> {
        self.plays.lock().clone()
    }
}

#[async_trait]
impl CatalogService for RecordingCatalog {
    async fn increment_play_count(&self, beat_id: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("catalog offline".to_string()));
        }
        self.plays.lock().push(beat_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A loader wired to fakes, with handles to every fake.
pub struct Harness {
    pub loader: PlaybackLoader,
    pub cache: Arc<AudioCache>,
    pub store: Arc<InMemoryAudioStore>,
    pub transport: Arc<RecordingTransport>,
    pub blobs: Arc<CountingBlobRegistry>,
    pub provider: Arc<GatedProvider>,
    pub http: Arc<FakeHttp>,
    pub catalog: Arc<RecordingCatalog>,
    pub bus: EventBus,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default().with_metadata_timeout(Duration::from_millis(100)))
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        let store = Arc::new(InMemoryAudioStore::new());
        let bus = EventBus::new(256);
        let cache = Arc::new(
            AudioCache::new(
                Arc::new(InMemoryStoreOpener::new(store.clone())),
                CacheConfig::default(),
            )
            .with_event_bus(bus.clone()),
        );
        let transport = RecordingTransport::new();
        let blobs = CountingBlobRegistry::new();
        let provider = GatedProvider::new();
        let http = FakeHttp::new();
        let catalog = RecordingCatalog::new();

        let loader = PlaybackLoader::builder()
            .cache(cache.clone())
            .http_client(http.clone())
            .audio_transport(transport.clone())
            .blob_registry(blobs.clone())
            .cloud_provider(provider.clone())
            .catalog(catalog.clone())
            .event_bus(bus.clone())
            .config(config)
            .build()
            .expect("loader should build");

        Self {
            loader,
            cache,
            store,
            transport,
            blobs,
            provider,
            http,
            catalog,
            bus,
        }
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.bus.subscribe()
    }
}

pub fn track(id: &str) -> TrackRef {
    TrackRef::from_cloud(id, "dropbox", format!("/beats/{}.mp3", id))
}

pub fn file_id(id: &str) -> String {
    format!("/beats/{}.mp3", id)
}

/// Everything currently queued on `rx`.
pub fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
