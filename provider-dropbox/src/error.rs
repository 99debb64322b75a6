//! Error types for the Dropbox provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Dropbox provider errors
#[derive(Error, Debug)]
pub enum DropboxError {
    /// Access token was rejected by the API
    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    /// No refresh token is configured, so an expired session cannot be renewed
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// Token endpoint refused the refresh-token grant
    #[error("Token refresh failed (status {status_code}): {message}")]
    TokenRefreshFailed { status_code: u16, message: String },

    /// API request returned an error
    #[error("Dropbox API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Rate limit still exceeded after all retries
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Path does not resolve to a file
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Dropbox operations
pub type Result<T> = std::result::Result<T, DropboxError>;

impl DropboxError {
    /// Returns `true` when refreshing credentials may resolve the failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            DropboxError::Unauthorized(_) | DropboxError::MissingRefreshToken
        ) || matches!(self, DropboxError::BridgeError(e) if e.is_unauthorized())
    }
}

impl From<DropboxError> for BridgeError {
    fn from(error: DropboxError) -> Self {
        match error {
            DropboxError::Unauthorized(msg) => BridgeError::Unauthorized(msg),
            DropboxError::MissingRefreshToken => {
                BridgeError::Unauthorized("no refresh token available".to_string())
            }
            DropboxError::TokenRefreshFailed {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "Token refresh failed (status {}): {}",
                status_code, message
            )),
            DropboxError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            DropboxError::RateLimitExceeded {
                retry_after_seconds,
            } => BridgeError::OperationFailed(format!(
                "Rate limit exceeded, retry after {} seconds",
                retry_after_seconds
            )),
            DropboxError::FileNotFound { path } => {
                BridgeError::OperationFailed(format!("File not found: {}", path))
            }
            DropboxError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            DropboxError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DropboxError::ApiError {
            status_code: 400,
            message: "Bad request".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Dropbox API error (status 400): Bad request"
        );
    }

    #[test]
    fn test_unauthorized_survives_conversion() {
        let bridge_error: BridgeError = DropboxError::Unauthorized("expired".to_string()).into();
        assert!(bridge_error.is_unauthorized());

        let bridge_error: BridgeError = DropboxError::MissingRefreshToken.into();
        assert!(bridge_error.is_unauthorized());
    }

    #[test]
    fn test_other_errors_become_operation_failures() {
        let bridge_error: BridgeError = DropboxError::FileNotFound {
            path: "/beats/a.mp3".to_string(),
        }
        .into();

        assert!(matches!(bridge_error, BridgeError::OperationFailed(_)));
        assert!(!bridge_error.is_unauthorized());
    }

    #[test]
    fn test_auth_classification() {
        assert!(DropboxError::MissingRefreshToken.is_auth_error());
        assert!(DropboxError::BridgeError(BridgeError::Unauthorized("x".into())).is_auth_error());
        assert!(!DropboxError::ParseError("x".into()).is_auth_error());
    }
}
