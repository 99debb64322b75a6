//! Workspace umbrella crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates so a
//! host application can depend on `beatshelf-workspace` alone and get a wired
//! audio cache and playback loader through `core-service`.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
