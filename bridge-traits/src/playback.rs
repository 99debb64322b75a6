//! Playback bridge traits and supporting media types.
//!
//! The core never decodes audio itself. It hands an in-memory object URL to a
//! single host-provided media element ([`AudioTransport`]) and drives it with
//! play, pause, seek and volume commands. Object URLs are minted and revoked
//! through a [`BlobRegistry`] so the core can guarantee every URL it created
//! is eventually released.

use bytes::Bytes;
use std::fmt;

use crate::{
    error::Result,
    platform::{PlatformFuture, PlatformSendSync},
};

/// Origin-local URL referencing an in-memory blob.
///
/// Only valid until revoked through the [`BlobRegistry`] that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and releases object URLs for in-memory audio bytes.
pub trait BlobRegistry: PlatformSendSync {
    /// Wrap `data` in a blob and return a URL the transport can load.
    fn create(&self, data: Bytes, mime_type: Option<&str>) -> Result<BlobUrl>;

    /// Release a previously created URL. Revoking twice is a no-op.
    fn revoke(&self, url: &BlobUrl);
}

/// Notifications raised by the media element while a source is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Playback position advanced.
    TimeUpdate { position_seconds: f64 },
    /// Duration became known.
    LoadedMetadata { duration_seconds: f64 },
    /// Playback reached the end of the source.
    Ended,
}

/// Future returned by [`AudioTransport::play`]; resolves to an error when the
/// host refuses to start (autoplay policy, detached source).
pub type PlayFuture = PlatformFuture<Result<()>>;

/// Future returned by [`AudioTransport::metadata_ready`]; resolves with the
/// duration in seconds, or `None` if the source was replaced or failed first.
pub type MetadataFuture = PlatformFuture<Option<f64>>;

/// The host's single media element.
///
/// Every command is initiated synchronously so the caller can issue it while
/// holding its own state lock. Only `play` and `metadata_ready` have an
/// asynchronous tail.
///
/// Implementations must not call back into the loader from inside a command.
/// [`MediaEvent`]s raised as a side effect of `attach_source`, `detach_source`,
/// `play` or `pause` have to be queued and delivered after the command
/// returns; delivering them re-entrantly deadlocks on the loader's state lock.
pub trait AudioTransport: PlatformSendSync {
    /// Replace the current source.
    fn attach_source(&self, source: &BlobUrl);

    /// Drop the current source without attaching a new one.
    fn detach_source(&self);

    /// Start playback of the attached source.
    fn play(&self) -> PlayFuture;

    fn pause(&self);

    /// Jump to `position_seconds`.
    fn seek(&self, position_seconds: f64);

    /// Apply a volume already normalized to `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    /// Wait until the attached source reports its metadata.
    fn metadata_ready(&self) -> MetadataFuture;
}

/// Audio extensions accepted when importing from cloud folders.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "m4a", "ogg"];

/// Best-effort MIME type for an audio file name, keyed on its extension.
pub fn audio_mime_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "aac" => Some("audio/aac"),
        "flac" => Some("audio/flac"),
        "m4a" => Some("audio/mp4"),
        "ogg" => Some("audio/ogg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_url_display() {
        let url = BlobUrl::new("blob:beatshelf/1234");
        assert_eq!(url.as_str(), "blob:beatshelf/1234");
        assert_eq!(url.to_string(), "blob:beatshelf/1234");
    }

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(audio_mime_type("/Beats/Night Drive.MP3"), Some("audio/mpeg"));
        assert_eq!(audio_mime_type("loop.m4a"), Some("audio/mp4"));
        assert_eq!(audio_mime_type("cover.png"), None);
        assert_eq!(audio_mime_type("no_extension"), None);
    }

    #[test]
    fn supported_extensions_all_have_mime_types() {
        for ext in SUPPORTED_AUDIO_EXTENSIONS {
            let name = format!("track.{}", ext);
            assert!(audio_mime_type(&name).is_some(), "{} missing", ext);
        }
    }
}
