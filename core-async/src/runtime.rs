//! Runtime utilities that abstract over the underlying async executor.
//!
//! Only native targets have a runtime handle to look up; on WebAssembly the
//! browser event loop is always present and [`crate::task::spawn_detached`]
//! is enough.

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Returns the I/O error raised while building the runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
