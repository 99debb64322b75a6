//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the cache and loader depend on.
//! It establishes the logging conventions, the fail-fast configuration
//! builder, and the event broadcasting used to surface load progress to a UI.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
