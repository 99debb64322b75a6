//! Time-related abstractions.
//!
//! - On native platforms: Uses `tokio::time`
//! - On WASM: Uses `gloo-timers` (the browser's `setTimeout`)
//!
//! Both targets expose the same `sleep` and `timeout` signatures so callers
//! never need a `cfg` of their own.

pub use std::time::Duration;

// ============================================================================
// Native Implementation (Tokio)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::time::{error::Elapsed, sleep, timeout, Instant};

// ============================================================================
// WASM Implementation
// ============================================================================

/// Error returned by [`timeout`] when the deadline passes first.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

#[cfg(target_arch = "wasm32")]
impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline has elapsed")
    }
}

#[cfg(target_arch = "wasm32")]
impl std::error::Error for Elapsed {}

/// Sleeps for the specified duration.
#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await
}

/// Requires `future` to complete before `duration` has elapsed.
#[cfg(target_arch = "wasm32")]
pub async fn timeout<F>(duration: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: std::future::Future,
{
    use futures::future::{select, Either};

    let future = std::pin::pin!(future);
    let deadline = std::pin::pin!(sleep(duration));
    match select(future, deadline).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(Elapsed),
    }
}
