//! # Host Bridge Traits
//!
//! Capabilities the playback core needs from its host environment.
//!
//! ## Overview
//!
//! The core library owns the cache policy and the load-session state machine;
//! everything that touches the outside world is reached through a trait
//! defined here and injected at startup.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP for provider APIs and audio downloads
//! - [`CloudAccessProvider`](cloud::CloudAccessProvider) - Streaming URLs and token refresh
//! - [`CatalogService`](catalog::CatalogService) - Play-count updates in the remote catalog
//!
//! ### Storage
//! - [`AudioStore`](storage::AudioStore) - Transactional audio/metadata/waveform store
//! - [`AudioStoreOpener`](storage::AudioStoreOpener) - Environment probe for persistent storage
//!
//! ### Media
//! - [`AudioTransport`](playback::AudioTransport) - The single media element
//! - [`BlobRegistry`](playback::BlobRegistry) - Object URL lifecycle
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HTTP, SQLite store, blob registry |
//! | Web      | TBD                 | 📋 Planned (IndexedDB, `HTMLAudioElement`) |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map rejected credentials to
//! [`BridgeError::Unauthorized`](error::BridgeError::Unauthorized) so the
//! loader can refresh and retry once.
//!
//! ## Thread Safety
//!
//! On native targets every trait requires `Send + Sync` via
//! [`PlatformSendSync`](platform::PlatformSendSync); on `wasm32` the bound is
//! relaxed because browser handles are single-threaded.

pub mod catalog;
pub mod cloud;
pub mod error;
pub mod http;
pub mod platform;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::CatalogService;
pub use cloud::{CloudAccessProvider, DROPBOX_PROVIDER_TAG};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use platform::{PlatformFuture, PlatformSend, PlatformSendSync};
pub use playback::{
    audio_mime_type, AudioTransport, BlobRegistry, BlobUrl, MediaEvent, MetadataFuture,
    PlayFuture, SUPPORTED_AUDIO_EXTENSIONS,
};
pub use storage::{
    AudioStore, AudioStoreOpener, MetadataRecord, StoredAudio, StoredMetadata, StoredWaveform,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
