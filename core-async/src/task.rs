//! Task spawning and execution abstractions.
//!
//! - On native platforms: Uses `tokio::task::spawn`
//! - On WASM: Uses `wasm_bindgen_futures::spawn_local`
//!
//! Background work that must be awaitable later (pending cache writes) goes
//! through a [`TaskTracker`]: wrap the future with
//! [`TaskTracker::track_future`] and hand it to [`spawn_detached`].
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::{spawn_detached, TaskTracker};
//!
//! async fn example(tracker: &TaskTracker) {
//!     spawn_detached(tracker.track_future(async {
//!         // Persist something in the background
//!     }));
//!
//!     tracker.close();
//!     tracker.wait().await;
//! }
//! ```

pub use tokio_util::task::TaskTracker;

// ============================================================================
// Native Implementation (Tokio)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task using the Tokio runtime.
///
/// The spawned task may run on a different thread.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Spawns a fire-and-forget task whose result nobody awaits.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    drop(tokio::task::spawn(future));
}

// ============================================================================
// WASM Implementation
// ============================================================================

/// Spawns a task on the browser's event loop.
///
/// The output is discarded; use a [`TaskTracker`] or a channel to observe
/// completion.
#[cfg(target_arch = "wasm32")]
pub fn spawn<F>(future: F)
where
    F: std::future::Future + 'static,
{
    wasm_bindgen_futures::spawn_local(async move {
        let _ = future.await;
    });
}

/// Spawns a fire-and-forget task on the browser's event loop.
#[cfg(target_arch = "wasm32")]
pub fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

#[cfg(target_arch = "wasm32")]
pub async fn yield_now() {
    crate::time::sleep(std::time::Duration::from_millis(0)).await;
}
