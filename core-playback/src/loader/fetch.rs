//! Resolving a track to bytes over the network.

use bridge_traits::cloud::CloudAccessProvider;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::cloud::CloudProviderRegistry;
use crate::error::{PlaybackError, Result};
use crate::models::TrackRef;

/// Streaming-URL lookup plus plain `GET` download.
pub(crate) struct SourceFetcher {
    providers: CloudProviderRegistry,
    http_client: Arc<dyn HttpClient>,
    refresh_on_unauthorized: bool,
}

impl SourceFetcher {
    pub(crate) fn new(
        providers: CloudProviderRegistry,
        http_client: Arc<dyn HttpClient>,
        refresh_on_unauthorized: bool,
    ) -> Self {
        Self {
            providers,
            http_client,
            refresh_on_unauthorized,
        }
    }

    pub(crate) fn providers(&self) -> &CloudProviderRegistry {
        &self.providers
    }

    /// Download the audio bytes for `track`.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub(crate) async fn fetch(&self, track: &TrackRef) -> Result<Bytes> {
        let url = self.resolve_stream_url(track).await?;
        self.download(&track.id, &url).await
    }

    async fn resolve_stream_url(&self, track: &TrackRef) -> Result<String> {
        if let Some((tag, file_id)) = track.cloud_source() {
            let provider = self
                .providers
                .get(tag)
                .ok_or_else(|| PlaybackError::UnknownProvider(tag.to_string()))?;
            return self.stream_url(provider.as_ref(), file_id).await;
        }

        match track.audio_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => Err(PlaybackError::MissingCloudSource(track.id.clone())),
        }
    }

    async fn stream_url(&self, provider: &dyn CloudAccessProvider, file_id: &str) -> Result<String> {
        let tag = provider.provider_tag();

        match provider.get_stream_url(file_id).await {
            Ok(url) => Ok(url),
            Err(e) if e.is_unauthorized() && self.refresh_on_unauthorized => {
                info!(provider = tag, "Stream URL rejected; refreshing credentials");
                provider
                    .refresh_auth()
                    .await
                    .map_err(|e| PlaybackError::Unauthorized(e.to_string()))?;
                provider
                    .get_stream_url(file_id)
                    .await
                    .map_err(|e| PlaybackError::stream_url(tag, e))
            }
            Err(e) => Err(PlaybackError::stream_url(tag, e)),
        }
    }

    async fn download(&self, track_id: &str, url: &str) -> Result<Bytes> {
        debug!(url = %redact_url(url), "Downloading audio");

        let response = self
            .http_client
            .execute(HttpRequest::get(url))
            .await
            .map_err(|e| PlaybackError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(PlaybackError::HttpStatus {
                status: response.status,
            });
        }

        if response.body.is_empty() {
            return Err(PlaybackError::EmptyAudio(track_id.to_string()));
        }

        debug!(bytes = response.body.len(), "Downloaded audio");
        Ok(response.body)
    }
}
