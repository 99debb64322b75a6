//! # Audio Cache Module
//!
//! Durable, origin-local storage of raw audio bytes keyed by track id, with a
//! stats surface and optional LRU eviction.
//!
//! ## Overview
//!
//! - Lazy, environment-gated initialization through an
//!   [`AudioStoreOpener`](bridge_traits::storage::AudioStoreOpener); a missing
//!   store degrades every operation to "nothing cached"
//! - Access-time bookkeeping on every read
//! - Least-recently-accessed eviction when a size cap is configured
//! - Independent waveform keyspace for visualizations
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     AudioCache                         │
//! │  - cache_audio() / get_cached_audio()  │
//! │  - cache_waveform()                    │
//! │  - enforce_size_limit()                │
//! └────────┬───────────────────────────────┘
//!          │ opened once
//!          ├──> AudioStore (SQLite / IndexedDB / in-memory)
//!          └──> EventBus (optional CacheEvents)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bytes::Bytes;
//! use core_playback::cache::{AudioCache, CacheConfig, InMemoryStoreOpener};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = AudioCache::new(Arc::new(InMemoryStoreOpener::default()), CacheConfig::default());
//!
//! cache.cache_audio("beat-1", Bytes::from_static(b"ID3...")).await;
//! assert!(cache.get_cached_audio("beat-1").await.is_some());
//!
//! let stats = cache.get_cache_stats().await;
//! assert_eq!(stats.count, 1);
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod memory;
pub mod stats;

// Re-export commonly used types
pub use config::CacheConfig;
pub use manager::AudioCache;
pub use memory::{InMemoryAudioStore, InMemoryStoreOpener, UnavailableStoreOpener};
pub use stats::{CacheCounters, CacheStats};
