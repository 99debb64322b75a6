//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry on 429/5xx
//! - `AudioStore` using SQLite through `sqlx` (the native counterpart of the
//!   browser's IndexedDB database)
//! - `BlobRegistry` holding blobs in process memory
//!
//! The audio transport is always host-specific (a native audio engine or a
//! webview's media element) and is not provided here.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{InMemoryBlobRegistry, ReqwestHttpClient, SqliteStoreOpener};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let store_opener = SqliteStoreOpener::new(data_dir.join("audio-cache.db"));
//! let blobs = InMemoryBlobRegistry::new();
//! ```

mod audio_store;
mod blob;
mod http;

pub use audio_store::{SqliteAudioStore, SqliteStoreOpener};
pub use blob::InMemoryBlobRegistry;
pub use http::{ReqwestHttpClient, RetryPolicy};
