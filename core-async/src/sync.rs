//! Synchronization primitives.
//!
//! Tokio's `sync` module has no runtime dependency and compiles for the
//! browser, so both targets share the same types. Cancellation comes from
//! `tokio-util`.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::OnceCell;
//!
//! async fn example(cell: &OnceCell<u32>) -> u32 {
//!     // Concurrent callers all wait for the same initialization.
//!     *cell.get_or_init(|| async { 42 }).await
//! }
//! ```

pub use tokio::sync::{broadcast, oneshot, watch, Mutex, MutexGuard, Notify, OnceCell};
pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
