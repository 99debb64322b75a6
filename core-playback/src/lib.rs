//! # Playback Core
//!
//! Client-side audio cache plus playback loader for a beat library.
//!
//! ## Overview
//!
//! This crate handles:
//! - [`cache`]: persistent audio cache in front of cloud downloads
//! - [`loader`]: the load-session state machine driving the host's media element
//! - [`cloud`]: provider lookup by the tag recorded on each track
//!
//! Everything that touches the outside world (HTTP, storage, media element,
//! object URLs) is reached through `bridge-traits` so the same core runs on
//! desktop and in the browser.

pub mod cache;
pub mod cloud;
pub mod error;
pub mod loader;
pub mod models;

pub use cache::{AudioCache, CacheConfig, CacheStats};
pub use cloud::CloudProviderRegistry;
pub use error::{PlaybackError, Result};
pub use loader::{
    LoadOutcome, LoadPhase, LoaderConfig, PendingLoad, PlaybackLoader, PlaybackLoaderBuilder,
    PlaybackState,
};
pub use models::TrackRef;
