//! Platform-specific helper abstractions used to keep trait bounds aligned with
//! the threading guarantees of each target.
//!
//! Native targets require `Send + Sync` so bridge implementations can be shared
//! across Tokio worker threads. Browser builds run on a single thread where
//! `web_sys` handles (media elements, object URLs, IndexedDB requests) are not
//! thread-safe, so the bounds collapse to no-ops on `wasm32`.

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}

/// Marker trait equivalent to `Send` on native targets.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSend: Send {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSend for T where T: Send {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSend {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSend for T {}

/// Boxed future returned by synchronous-initiation bridge calls.
///
/// `Send` on native targets, local on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformFuture<T> = futures::future::BoxFuture<'static, T>;

#[cfg(target_arch = "wasm32")]
pub type PlatformFuture<T> = futures::future::LocalBoxFuture<'static, T>;
