//! Runtime-agnostic async abstraction layer for Beatshelf.
//!
//! This crate provides a unified async API that works across different runtime environments:
//! - Native platforms (desktop): Uses Tokio runtime
//! - WebAssembly: Uses browser's event loop with wasm-bindgen-futures
//!
//! All core-* and provider-* crates depend on this crate instead of reaching
//! for Tokio directly, so the cache and loader compile unchanged for the
//! browser build.
//!
//! # Modules
//!
//! - `task`: Task spawning and background-task tracking
//! - `time`: Sleep and timeouts
//! - `sync`: Synchronization primitives and cancellation
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{timeout, Duration};
//!
//! async fn example(token: CancellationToken) {
//!     let waited = token
//!         .run_until_cancelled(timeout(Duration::from_secs(2), async { 42 }))
//!         .await;
//!
//!     // `None` when cancelled, `Some(Err(_))` when the deadline passed.
//!     let _ = waited;
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

// Re-export commonly used types at crate root for convenience
pub use task::{spawn, spawn_detached};
pub use time::{sleep, timeout, Duration};
