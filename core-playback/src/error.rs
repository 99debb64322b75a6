//! # Playback Error Types
//!
//! Failures a load session can end with. None of these escape to the caller
//! of a track selection as a panic; the loader reports them inside
//! [`LoadOutcome::Failed`](crate::loader::LoadOutcome::Failed) after logging.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur while loading or controlling playback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Track has neither cloud coordinates nor a direct audio URL.
    #[error("Track {0} has no playable source")]
    MissingCloudSource(String),

    /// Track references a cloud provider that was never registered.
    #[error("Unknown cloud provider: {0}")]
    UnknownProvider(String),

    /// Provider could not mint a streaming URL.
    #[error("Failed to get stream URL from {provider}: {message}")]
    StreamUrl { provider: String, message: String },

    /// Credentials were rejected and refreshing them did not help.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // ========================================================================
    // Download Errors
    // ========================================================================
    /// Audio download returned a non-success status.
    #[error("Download failed with HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Network-level failure (connection, TLS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// Download succeeded but carried no bytes.
    #[error("Downloaded audio for {0} is empty")]
    EmptyAudio(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Host could not wrap the bytes in a playable object URL.
    #[error("Failed to create playable source: {0}")]
    BlobCreation(String),

    /// Media element refused to start playback.
    #[error("Audio transport rejected playback: {0}")]
    TransportRejected(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    #[error("Cache error: {0}")]
    Cache(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A newer selection replaced the session before it finished.
    #[error("Load superseded by a newer selection")]
    Superseded,

    /// Loader or cache configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Map a provider failure while fetching a streaming URL.
    pub fn stream_url(provider: &str, err: BridgeError) -> Self {
        match err {
            BridgeError::Unauthorized(message) => PlaybackError::Unauthorized(message),
            other => PlaybackError::StreamUrl {
                provider: provider.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Network(_) | PlaybackError::StreamUrl { .. } => true,
            PlaybackError::HttpStatus { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Network(_) | PlaybackError::HttpStatus { .. }
        )
    }

    /// Returns `true` if credentials were the cause.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, PlaybackError::Unauthorized(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url_maps_unauthorized() {
        let err = PlaybackError::stream_url(
            "dropbox",
            BridgeError::Unauthorized("expired_access_token".to_string()),
        );
        assert!(err.is_auth_error());
        assert!(!err.is_transient());

        let err = PlaybackError::stream_url(
            "dropbox",
            BridgeError::OperationFailed("path/not_found".to_string()),
        );
        assert!(matches!(err, PlaybackError::StreamUrl { ref provider, .. } if provider == "dropbox"));
    }

    #[test]
    fn test_http_status_classification() {
        assert!(PlaybackError::HttpStatus { status: 503 }.is_transient());
        assert!(PlaybackError::HttpStatus { status: 429 }.is_transient());
        assert!(!PlaybackError::HttpStatus { status: 404 }.is_transient());
        assert!(PlaybackError::HttpStatus { status: 404 }.is_network_error());
        assert!(!PlaybackError::Superseded.is_network_error());
    }
}
