//! Track references handed to the loader.

use bridge_traits::playback::audio_mime_type;
use serde::{Deserialize, Serialize};

/// The minimum a loader needs to know about a beat.
///
/// Tracks imported from cloud storage carry a provider tag plus an opaque file
/// identifier; tracks uploaded elsewhere may instead carry a direct URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub cloud_provider: Option<String>,
    pub cloud_file_id: Option<String>,
    pub audio_url: Option<String>,
}

impl TrackRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cloud_provider: None,
            cloud_file_id: None,
            audio_url: None,
        }
    }

    /// Track stored in a connected cloud account.
    pub fn from_cloud(
        id: impl Into<String>,
        provider: impl Into<String>,
        file_id: impl Into<String>,
    ) -> Self {
        Self {
            cloud_provider: Some(provider.into()),
            cloud_file_id: Some(file_id.into()),
            ..Self::new(id)
        }
    }

    /// Track reachable through a plain URL.
    pub fn from_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            audio_url: Some(url.into()),
            ..Self::new(id)
        }
    }

    /// Provider tag and file id, when both are recorded and non-empty.
    pub fn cloud_source(&self) -> Option<(&str, &str)> {
        match (self.cloud_provider.as_deref(), self.cloud_file_id.as_deref()) {
            (Some(provider), Some(file_id)) if !provider.is_empty() && !file_id.is_empty() => {
                Some((provider, file_id))
            }
            _ => None,
        }
    }

    /// MIME type guessed from the file id or URL extension.
    pub fn mime_type_hint(&self) -> Option<&'static str> {
        self.cloud_file_id
            .as_deref()
            .and_then(audio_mime_type)
            .or_else(|| {
                self.audio_url
                    .as_deref()
                    .map(|url| url.split(['?', '#']).next().unwrap_or(url))
                    .and_then(audio_mime_type)
            })
    }
}
