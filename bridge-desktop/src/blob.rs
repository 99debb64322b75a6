//! Process-local blob registry
//!
//! Desktop hosts have no browser object-URL table, so blobs live in a map
//! keyed by a generated `blob:` URL until revoked. The host's audio engine
//! resolves the URL back to bytes with [`InMemoryBlobRegistry::resolve`].

use bridge_traits::{
    error::Result,
    playback::{BlobRegistry, BlobUrl},
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct BlobEntry {
    data: Bytes,
    mime_type: Option<String>,
}

/// [`BlobRegistry`] that keeps blob bytes in memory.
#[derive(Debug, Default)]
pub struct InMemoryBlobRegistry {
    blobs: Mutex<HashMap<BlobUrl, BlobEntry>>,
}

impl InMemoryBlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes and MIME type behind a live URL.
    pub fn resolve(&self, url: &BlobUrl) -> Option<(Bytes, Option<String>)> {
        self.blobs
            .lock()
            .get(url)
            .map(|entry| (entry.data.clone(), entry.mime_type.clone()))
    }

    /// Number of URLs created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }
}

impl BlobRegistry for InMemoryBlobRegistry {
    fn create(&self, data: Bytes, mime_type: Option<&str>) -> Result<BlobUrl> {
        let url = BlobUrl::new(format!("blob:beatshelf/{}", Uuid::new_v4()));
        let size = data.len();
        self.blobs.lock().insert(
            url.clone(),
            BlobEntry {
                data,
                mime_type: mime_type.map(str::to_string),
            },
        );
        debug!(url = %url, bytes = size, "Created blob");
        Ok(url)
    }

    fn revoke(&self, url: &BlobUrl) {
        if self.blobs.lock().remove(url).is_some() {
            debug!(url = %url, "Revoked blob");
        } else {
            trace!(url = %url, "Revoke of unknown blob ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resolve_revoke() {
        let registry = InMemoryBlobRegistry::new();
        let url = registry
            .create(Bytes::from_static(b"RIFF"), Some("audio/wav"))
            .unwrap();

        assert!(url.as_str().starts_with("blob:beatshelf/"));
        let (data, mime) = registry.resolve(&url).unwrap();
        assert_eq!(data.as_ref(), b"RIFF");
        assert_eq!(mime.as_deref(), Some("audio/wav"));
        assert_eq!(registry.live_count(), 1);

        registry.revoke(&url);
        registry.revoke(&url);
        assert!(registry.resolve(&url).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = InMemoryBlobRegistry::new();
        let a = registry.create(Bytes::from_static(b"a"), None).unwrap();
        let b = registry.create(Bytes::from_static(b"a"), None).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }
}
