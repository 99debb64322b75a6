//! Remote Catalog Abstraction
//!
//! The catalog (beats, tags, collections) lives in a remote relational store
//! that the surrounding UI talks to directly. The playback core only touches
//! it to bump a beat's play counter when loading starts.

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Narrow view of the remote catalog used by the playback loader.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait CatalogService: PlatformSendSync {
    /// Increment the play counter for `beat_id`.
    async fn increment_play_count(&self, beat_id: &str) -> Result<()>;
}
