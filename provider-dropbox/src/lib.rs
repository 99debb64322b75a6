//! # Dropbox Provider
//!
//! Implements `CloudAccessProvider` for the Dropbox API v2.
//!
//! ## Overview
//!
//! This module provides:
//! - Short-lived streaming links via `files/get_temporary_link`
//! - OAuth 2.0 refresh-token grant against a configurable token endpoint
//! - Proactive refresh shortly before the access token expires
//! - Rate limiting and exponential backoff

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{DropboxConfig, DropboxConnector};
pub use error::{DropboxError, Result};
pub use types::DropboxCredentials;
