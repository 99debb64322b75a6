//! Persistent Audio Storage Abstractions
//!
//! Origin-local, transactional key-value storage with three independent
//! keyspaces addressed by track identifier:
//!
//! - **audio**: raw encoded audio bytes plus the time they were stored
//! - **metadata**: last access time and size, one-to-one with audio entries
//! - **waveforms**: normalized amplitude samples used for visualization
//!
//! Hosts implement these traits with whatever durable storage they have:
//! IndexedDB in a browser, SQLite on desktop. Environments without any
//! persistent facility (server-side rendering, sandboxed tests) return `None`
//! from [`AudioStoreOpener::open`] and the core degrades to "nothing cached".

use bytes::Bytes;
use std::sync::Arc;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Audio bytes persisted for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudio {
    pub track_id: String,
    pub data: Bytes,
    /// Unix timestamp (milliseconds) when the entry was written.
    pub stored_at: i64,
}

/// Bookkeeping row kept alongside every audio entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredMetadata {
    /// Unix timestamp (milliseconds) of the last read or write.
    pub last_accessed_at: i64,
    pub size_bytes: u64,
}

/// Metadata row paired with its key, as returned by full scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub track_id: String,
    pub metadata: StoredMetadata,
}

/// Waveform samples persisted for a track.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWaveform {
    pub track_id: String,
    pub samples: Vec<f32>,
    pub stored_at: i64,
}

/// Transactional store backing the audio cache.
///
/// Multi-keyspace operations (`put_audio`, `remove`, `clear`) must be atomic:
/// either every keyspace reflects the change or none does.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioStore: PlatformSendSync {
    /// Insert or overwrite the audio entry and its metadata in one transaction.
    async fn put_audio(&self, audio: StoredAudio, metadata: StoredMetadata) -> Result<()>;

    /// Fetch the audio entry for `track_id`.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_audio(&self, track_id: &str) -> Result<Option<StoredAudio>>;

    /// Update `last_accessed_at` for an existing metadata row.
    ///
    /// Missing rows are ignored.
    async fn touch(&self, track_id: &str, accessed_at: i64) -> Result<()>;

    /// Fetch the metadata row for `track_id`.
    async fn get_metadata(&self, track_id: &str) -> Result<Option<StoredMetadata>>;

    /// Scan every metadata row.
    async fn list_metadata(&self) -> Result<Vec<MetadataRecord>>;

    /// Insert or overwrite waveform samples.
    async fn put_waveform(&self, waveform: StoredWaveform) -> Result<()>;

    /// Fetch waveform samples for `track_id`.
    async fn get_waveform(&self, track_id: &str) -> Result<Option<StoredWaveform>>;

    /// Delete audio, metadata and waveform entries for `track_id`.
    ///
    /// Deleting a missing key is not an error.
    async fn remove(&self, track_id: &str) -> Result<()>;

    /// Delete every entry from every keyspace.
    async fn clear(&self) -> Result<()>;
}

/// Environment probe that opens the persistent store.
///
/// Called at most once per process by the cache. Returning `Ok(None)` means
/// the environment has no persistent storage; errors are treated the same way
/// after being logged.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioStoreOpener: PlatformSendSync {
    async fn open(&self) -> Result<Option<Arc<dyn AudioStore>>>;
}
