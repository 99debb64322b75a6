//! Dropbox API connector implementation
//!
//! Implements the `CloudAccessProvider` trait for the Dropbox API v2.

use bridge_traits::cloud::{CloudAccessProvider, DROPBOX_PROVIDER_TAG};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, SystemClock};
use core_async::sync::Mutex as AsyncMutex;
use core_async::time::sleep;
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{DropboxError, Result};
use crate::types::{
    ApiErrorResponse, DropboxCredentials, TemporaryLinkRequest, TemporaryLinkResponse,
    TokenResponse,
};

/// Dropbox API base URL
pub const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com/2";

/// Dropbox OAuth 2.0 token endpoint
pub const DROPBOX_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Refresh this long before the access token expires
const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(60);

const DEFAULT_MAX_RETRIES: u32 = 3;
/// Upper bound on `max_retries`.
const MAX_RETRIES_LIMIT: u32 = 10;
/// Longest delay between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connector settings.
///
/// By default the refresh-token grant goes straight to Dropbox with the
/// app's client credentials. Hosts that keep the client secret on a server
/// point `token_url` at their own endpoint with [`DropboxConfig::with_token_proxy`];
/// the connector then posts only `{"refresh_token": ...}` as JSON and expects
/// Dropbox's token response back.
#[derive(Clone)]
pub struct DropboxConfig {
    pub api_base: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Post the refresh token as JSON to a host-side proxy
    pub token_proxy: bool,
    /// Attempts per request, including the first one
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub refresh_buffer: Duration,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            api_base: DROPBOX_API_BASE.to_string(),
            token_url: DROPBOX_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            token_proxy: false,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
        }
    }
}

impl DropboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = client_secret;
        self
    }

    pub fn with_token_proxy(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self.token_proxy = true;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.api_base.is_empty() {
            return Err("api_base must not be empty".to_string());
        }
        if self.token_url.is_empty() {
            return Err("token_url must not be empty".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(format!("max_retries must be at most {}", MAX_RETRIES_LIMIT));
        }
        Ok(())
    }
}

impl fmt::Debug for DropboxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DropboxConfig")
            .field("api_base", &self.api_base)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_proxy", &self.token_proxy)
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}

/// Dropbox API connector
///
/// Implements `CloudAccessProvider` for one connected Dropbox account.
///
/// # Features
///
/// - Temporary streaming links (valid for four hours, no auth header needed)
/// - Proactive token refresh inside the configured expiry buffer
/// - Single-flight refresh: concurrent callers share one token grant
/// - Exponential backoff for rate limiting and server errors
///
/// # Example
///
/// ```ignore
/// use provider_dropbox::{DropboxConnector, DropboxCredentials};
/// use bridge_traits::cloud::CloudAccessProvider;
///
/// let credentials = DropboxCredentials::new(access_token).with_refresh_token(refresh_token);
/// let connector = DropboxConnector::new(http_client, credentials);
/// let url = connector.get_stream_url("/Beats/night-drive.mp3").await?;
/// ```
pub struct DropboxConnector {
    http_client: Arc<dyn HttpClient>,
    config: DropboxConfig,
    credentials: Mutex<DropboxCredentials>,
    /// Held for the duration of a token grant
    refresh_lock: AsyncMutex<()>,
    clock: Arc<dyn Clock>,
}

impl DropboxConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, credentials: DropboxCredentials) -> Self {
        Self {
            http_client,
            config: DropboxConfig::default(),
            credentials: Mutex::new(credentials),
            refresh_lock: AsyncMutex::new(()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: DropboxConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DropboxConfig {
        &self.config
    }

    /// Snapshot of the current credentials.
    pub fn credentials(&self) -> DropboxCredentials {
        self.credentials.lock().clone()
    }

    /// Return an access token, refreshing first when it is about to expire.
    async fn access_token(&self) -> Result<String> {
        let current = self.credentials();
        let buffer = chrono::Duration::from_std(self.config.refresh_buffer)
            .unwrap_or_else(|_| chrono::Duration::zero());

        if current.refresh_token.is_none()
            || !current.expires_within(self.clock.now(), buffer)
        {
            return Ok(current.access_token);
        }

        debug!("Access token expiring soon, refreshing");
        self.refresh_unless_renewed(&current.access_token).await?;
        Ok(self.credentials.lock().access_token.clone())
    }

    /// Run a token grant unless another caller already replaced `stale_token`.
    async fn refresh_unless_renewed(&self, stale_token: &str) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        if self.credentials.lock().access_token != stale_token {
            debug!("Credentials renewed by a concurrent refresh");
            return Ok(());
        }

        self.refresh_locked().await
    }

    #[instrument(skip(self))]
    async fn refresh_locked(&self) -> Result<()> {
        let refresh_token = self
            .credentials
            .lock()
            .refresh_token
            .clone()
            .ok_or(DropboxError::MissingRefreshToken)?;

        let request = self.token_request(&refresh_token)?;
        let response = self.execute_with_retry(request).await?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).to_string();
            warn!(status = response.status, "Token refresh rejected");
            return Err(DropboxError::TokenRefreshFailed {
                status_code: response.status,
                message,
            });
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DropboxError::ParseError(format!("Failed to parse token response: {}", e)))?;

        let expires_at = self.clock.now() + chrono::Duration::seconds(token.expires_in);
        {
            let mut credentials = self.credentials.lock();
            credentials.access_token = token.access_token;
            credentials.expires_at = Some(expires_at);
            if let Some(rotated) = token.refresh_token {
                credentials.refresh_token = Some(rotated);
            }
        }

        info!(expires_in = token.expires_in, "Refreshed Dropbox access token");
        Ok(())
    }

    fn token_request(&self, refresh_token: &str) -> Result<HttpRequest> {
        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .timeout(self.config.request_timeout);

        if self.config.token_proxy {
            return Ok(request.json(&serde_json::json!({ "refresh_token": refresh_token }))?);
        }

        let refresh_token = urlencoding::encode(refresh_token);
        let client_id = self.config.client_id.as_deref().map(urlencoding::encode);
        let client_secret = self.config.client_secret.as_deref().map(urlencoding::encode);

        let mut pairs = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", &*refresh_token),
        ];
        if let Some(client_id) = client_id.as_deref() {
            pairs.push(("client_id", client_id));
        }
        if let Some(client_secret) = client_secret.as_deref() {
            pairs.push(("client_secret", client_secret));
        }

        Ok(request.form(&pairs))
    }

    #[instrument(skip(self, path), fields(file = %strip_path(path)))]
    async fn temporary_link(&self, path: &str) -> Result<String> {
        let access_token = self.access_token().await?;
        let request = HttpRequest::new(
            HttpMethod::Post,
            format!("{}/files/get_temporary_link", self.config.api_base),
        )
        .bearer_token(access_token)
        .json(&TemporaryLinkRequest { path })?
        .timeout(self.config.request_timeout);

        let response = self.execute_with_retry(request).await?;

        match response.status {
            200 => {
                let parsed: TemporaryLinkResponse = serde_json::from_slice(&response.body)
                    .map_err(|e| {
                        DropboxError::ParseError(format!("Failed to parse temporary link: {}", e))
                    })?;

                if parsed.link.is_empty() {
                    return Err(DropboxError::ParseError(
                        "temporary link response carried an empty link".to_string(),
                    ));
                }

                debug!(
                    size = parsed.metadata.as_ref().and_then(|m| m.size),
                    "Temporary link issued"
                );
                Ok(parsed.link)
            }
            401 => Err(DropboxError::Unauthorized(error_summary(&response))),
            409 => {
                let summary = error_summary(&response);
                if summary.starts_with("path/not_found") {
                    Err(DropboxError::FileNotFound {
                        path: path.to_string(),
                    })
                } else {
                    Err(DropboxError::ApiError {
                        status_code: 409,
                        message: summary,
                    })
                }
            }
            status => Err(DropboxError::ApiError {
                status_code: status,
                message: error_summary(&response),
            }),
        }
    }

    /// Execute a request, retrying rate limits, server errors and transport failures.
    ///
    /// Any other status is handed back to the caller for interpretation.
    async fn execute_with_retry(&self, request: HttpRequest) -> Result<HttpResponse> {
        let max_retries = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) => {
                    let status = response.status;
                    if status != 429 && !response.is_server_error() {
                        return Ok(response);
                    }

                    attempt += 1;
                    let retry_after = retry_after_seconds(&response);
                    if attempt >= max_retries {
                        warn!(
                            "API request failed after {} attempts: status={}",
                            max_retries, status
                        );
                        return Err(if status == 429 {
                            DropboxError::RateLimitExceeded {
                                retry_after_seconds: retry_after.unwrap_or(0),
                            }
                        } else {
                            DropboxError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", max_retries),
                            }
                        });
                    }

                    let backoff = retry_after
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| backoff_for(attempt));
                    warn!(
                        "API request failed (attempt {}/{}): status={}, retrying in {}ms",
                        attempt,
                        max_retries,
                        status,
                        backoff.as_millis()
                    );
                    sleep(backoff).await;
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("API request failed after {} attempts: {}", max_retries, e);
                        return Err(e.into());
                    }

                    let backoff = backoff_for(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt,
                        max_retries,
                        e,
                        backoff.as_millis()
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}

fn backoff_for(attempt: u32) -> Duration {
    let millis = 2u64
        .checked_pow(attempt)
        .map_or(u64::MAX, |factor| factor.saturating_mul(100));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

fn retry_after_seconds(response: &HttpResponse) -> Option<u64> {
    response
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn error_summary(response: &HttpResponse) -> String {
    serde_json::from_slice::<ApiErrorResponse>(&response.body)
        .ok()
        .and_then(|e| e.error_summary)
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).to_string())
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl CloudAccessProvider for DropboxConnector {
    fn provider_tag(&self) -> &str {
        DROPBOX_PROVIDER_TAG
    }

    async fn get_stream_url(&self, file_id: &str) -> bridge_traits::error::Result<String> {
        Ok(self.temporary_link(file_id).await?)
    }

    async fn refresh_auth(&self) -> bridge_traits::error::Result<()> {
        let stale = self.credentials.lock().access_token.clone();
        Ok(self.refresh_unless_renewed(&stale).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::time::ManualClock;
    use bytes::Bytes;
    use mockall::{mock, Sequence};
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait::async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    const NOW_MILLIS: i64 = 1_700_000_000_000;

    fn respond(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn link_body(link: &str) -> String {
        format!(
            r#"{{"metadata": {{"name": "beat.mp3", "size": 2048}}, "link": "{}"}}"#,
            link
        )
    }

    fn is_link_request(req: &HttpRequest) -> bool {
        req.url.ends_with("/files/get_temporary_link")
    }

    fn is_token_request(req: &HttpRequest) -> bool {
        req.url == DROPBOX_TOKEN_URL
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NOW_MILLIS))
    }

    fn credentials_expiring_in(clock: &ManualClock, seconds: i64) -> DropboxCredentials {
        DropboxCredentials::new("sl.old")
            .with_refresh_token("refresh-1")
            .with_expires_at(clock.now() + chrono::Duration::seconds(seconds))
    }

    #[tokio::test]
    async fn test_get_stream_url_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.method == HttpMethod::Post
                    && is_link_request(req)
                    && req.headers.get("Authorization") == Some(&"Bearer sl.token".to_string())
                    && req.body.as_deref() == Some(&br#"{"path":"/Beats/a.mp3"}"#[..])
            })
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/a"))));

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));
        let url = connector.get_stream_url("/Beats/a.mp3").await.unwrap();

        assert_eq!(url, "https://dl.example/apitl/1/a");
        assert_eq!(connector.provider_tag(), "dropbox");
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(respond(
                401,
                r#"{"error_summary": "expired_access_token/..", "error": {".tag": "expired_access_token"}}"#,
            ))
        });

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));
        let error = connector.get_stream_url("/Beats/a.mp3").await.unwrap_err();

        assert!(error.is_unauthorized());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_unauthorized() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(respond(409, r#"{"error_summary": "path/not_found/.."}"#))
        });

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));
        let error = connector.get_stream_url("/Beats/gone.mp3").await.unwrap_err();

        assert!(matches!(error, BridgeError::OperationFailed(ref msg) if msg.contains("/Beats/gone.mp3")));
    }

    #[tokio::test]
    async fn test_empty_link_is_an_error() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(respond(200, &link_body(""))));

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));

        assert!(connector.get_stream_url("/Beats/a.mp3").await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_auth_form_grant() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                is_token_request(req)
                    && req.body.as_deref()
                        == Some(
                            &b"grant_type=refresh_token&refresh_token=refresh%2F1&client_id=app-key&client_secret=app-secret"[..],
                        )
            })
            .returning(|_| {
                Ok(respond(
                    200,
                    r#"{"access_token": "sl.new", "expires_in": 14400, "token_type": "bearer"}"#,
                ))
            });

        let clock = clock();
        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            DropboxCredentials::new("sl.old").with_refresh_token("refresh/1"),
        )
        .with_config(
            DropboxConfig::new().with_client_credentials("app-key", Some("app-secret".to_string())),
        )
        .with_clock(clock.clone());

        connector.refresh_auth().await.unwrap();

        let credentials = connector.credentials();
        assert_eq!(credentials.access_token, "sl.new");
        assert_eq!(credentials.refresh_token.as_deref(), Some("refresh/1"));
        assert_eq!(
            credentials.expires_at,
            Some(clock.now() + chrono::Duration::seconds(14400))
        );
    }

    #[tokio::test]
    async fn test_refresh_through_proxy_posts_json() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                req.url == "https://app.example/api/auth/dropbox/refresh"
                    && req.headers.get("Content-Type") == Some(&"application/json".to_string())
                    && req.body.as_deref() == Some(&br#"{"refresh_token":"refresh-1"}"#[..])
            })
            .returning(|_| {
                Ok(respond(
                    200,
                    r#"{"access_token": "sl.new", "expires_in": 3600, "refresh_token": "refresh-2"}"#,
                ))
            });

        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            DropboxCredentials::new("sl.old").with_refresh_token("refresh-1"),
        )
        .with_config(
            DropboxConfig::new().with_token_proxy("https://app.example/api/auth/dropbox/refresh"),
        );

        connector.refresh_auth().await.unwrap();
        assert_eq!(
            connector.credentials().refresh_token.as_deref(),
            Some("refresh-2")
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let mock_http = MockHttpClient::new();
        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.old"));

        let error = connector.refresh_auth().await.unwrap_err();
        assert!(error.is_unauthorized());
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(respond(400, r#"{"error": "invalid_grant"}"#)));

        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            DropboxCredentials::new("sl.old").with_refresh_token("revoked"),
        );

        let error = connector.refresh_auth().await.unwrap_err();
        assert!(matches!(error, BridgeError::OperationFailed(_)));
        assert_eq!(connector.credentials().access_token, "sl.old");
    }

    #[tokio::test]
    async fn test_proactive_refresh_near_expiry() {
        let clock = clock();
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(is_token_request)
            .returning(|_| Ok(respond(200, r#"{"access_token": "sl.new", "expires_in": 14400}"#)));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| {
                is_link_request(req)
                    && req.headers.get("Authorization") == Some(&"Bearer sl.new".to_string())
            })
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/b"))));

        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            credentials_expiring_in(&clock, 30),
        )
        .with_clock(clock.clone());

        let url = connector.get_stream_url("/Beats/b.mp3").await.unwrap();
        assert_eq!(url, "https://dl.example/apitl/1/b");
    }

    #[tokio::test]
    async fn test_no_refresh_outside_buffer() {
        let clock = clock();
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| {
                is_link_request(req)
                    && req.headers.get("Authorization") == Some(&"Bearer sl.old".to_string())
            })
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/c"))));

        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            credentials_expiring_in(&clock, 3600),
        )
        .with_clock(clock.clone());

        assert!(connector.get_stream_url("/Beats/c.mp3").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_runs_once() {
        let clock = clock();
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .withf(is_token_request)
            .returning(|_| Ok(respond(200, r#"{"access_token": "sl.new", "expires_in": 14400}"#)));
        mock_http
            .expect_execute()
            .times(2)
            .withf(is_link_request)
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/d"))));

        let connector = DropboxConnector::new(
            Arc::new(mock_http),
            credentials_expiring_in(&clock, 10),
        )
        .with_clock(clock.clone());

        let (a, b) = tokio::join!(
            connector.get_stream_url("/Beats/d.mp3"),
            connector.get_stream_url("/Beats/d.mp3")
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(connector.credentials().access_token, "sl.new");
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_are_retried() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(respond(503, "unavailable")));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/e"))));

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));

        let url = connector.get_stream_url("/Beats/e.mp3").await.unwrap();
        assert_eq!(url, "https://dl.example/apitl/1/e");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_max_retries() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(3).returning(|_| {
            let mut response = respond(429, r#"{"error_summary": "too_many_requests/.."}"#);
            response
                .headers
                .insert("Retry-After".to_string(), "2".to_string());
            Ok(response)
        });

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));

        let error = connector.get_stream_url("/Beats/f.mp3").await.unwrap_err();
        assert!(matches!(error, BridgeError::OperationFailed(ref msg) if msg.contains("Rate limit")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::OperationFailed("connection reset".to_string())));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(respond(200, &link_body("https://dl.example/apitl/1/g"))));

        let connector =
            DropboxConnector::new(Arc::new(mock_http), DropboxCredentials::new("sl.token"));

        assert!(connector.get_stream_url("/Beats/g.mp3").await.is_ok());
    }

    #[test]
    fn test_retry_after_header_is_case_insensitive() {
        let mut response = respond(429, "");
        response
            .headers
            .insert("retry-after".to_string(), " 7 ".to_string());

        assert_eq!(retry_after_seconds(&response), Some(7));
        assert_eq!(retry_after_seconds(&respond(429, "")), None);
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_for(1), Duration::from_millis(200));
        assert_eq!(backoff_for(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_for(8), Duration::from_millis(25_600));
        assert_eq!(backoff_for(9), MAX_BACKOFF);
        assert_eq!(backoff_for(58), MAX_BACKOFF);
        assert_eq!(backoff_for(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_config_validation() {
        assert!(DropboxConfig::default().validate().is_ok());
        assert!(DropboxConfig::new().with_max_retries(0).validate().is_err());
        assert!(DropboxConfig::new().with_max_retries(64).validate().is_err());
        assert!(DropboxConfig::new().with_api_base("").validate().is_err());
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = DropboxConfig::new().with_client_credentials("key", Some("hunter2".to_string()));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
