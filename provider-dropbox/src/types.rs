//! Dropbox API types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth credentials for one Dropbox account.
#[derive(Clone, Serialize, Deserialize)]
pub struct DropboxCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires, if known
    pub expires_at: Option<DateTime<Utc>>,
}

impl DropboxCredentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check whether the access token expires within `buffer` of `now`.
    ///
    /// Tokens without a known expiry are treated as valid until the API
    /// rejects them.
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - buffer <= now,
            None => false,
        }
    }
}

impl fmt::Debug for DropboxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxCredentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body of `files/get_temporary_link`
#[derive(Debug, Serialize)]
pub struct TemporaryLinkRequest<'a> {
    pub path: &'a str,
}

/// Response of `files/get_temporary_link`
#[derive(Debug, Deserialize)]
pub struct TemporaryLinkResponse {
    pub link: String,
    #[serde(default)]
    pub metadata: Option<FileMetadata>,
}

/// Subset of Dropbox file metadata returned alongside a temporary link
#[derive(Debug, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime of the new access token in seconds
    pub expires_in: i64,
    /// Present only when the endpoint rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Error envelope returned by Dropbox API endpoints
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error_summary: Option<String>,
}
