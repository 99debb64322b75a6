//! Cloud Access Provider Abstraction
//!
//! A cloud provider is a third-party file-hosting account (Dropbox today,
//! others reserved) holding the raw audio bytes of imported tracks. The core
//! only needs two capabilities from it: minting a short-lived streaming URL
//! for a file and renewing expired credentials.

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Tag recorded on tracks imported from Dropbox.
pub const DROPBOX_PROVIDER_TAG: &str = "dropbox";

/// Access to one connected cloud-storage account.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cloud::CloudAccessProvider;
///
/// async fn stream_url(provider: &dyn CloudAccessProvider, file_id: &str) -> Result<String> {
///     match provider.get_stream_url(file_id).await {
///         Err(e) if e.is_unauthorized() => {
///             provider.refresh_auth().await?;
///             provider.get_stream_url(file_id).await
///         }
///         other => other,
///     }
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait CloudAccessProvider: PlatformSendSync {
    /// Tag identifying the provider kind (e.g. `"dropbox"`).
    fn provider_tag(&self) -> &str;

    /// Obtain a short-lived URL that can be fetched without further auth headers.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unauthorized`](crate::error::BridgeError::Unauthorized)
    /// when the access token was rejected, other variants for network or API failures.
    async fn get_stream_url(&self, file_id: &str) -> Result<String>;

    /// Renew the account's access token.
    async fn refresh_auth(&self) -> Result<()>;
}
