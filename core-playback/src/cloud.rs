//! Lookup of cloud access providers by the tag recorded on each track.

use bridge_traits::cloud::CloudAccessProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Providers keyed by [`CloudAccessProvider::provider_tag`].
#[derive(Clone, Default)]
pub struct CloudProviderRegistry {
    providers: HashMap<String, Arc<dyn CloudAccessProvider>>,
}

impl CloudProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_providers(providers: impl IntoIterator<Item = Arc<dyn CloudAccessProvider>>) -> Self {
        let mut registry = Self::new();
        for provider in providers {
            registry.register(provider);
        }
        registry
    }

    /// Add a provider, returning the one it replaced under the same tag.
    pub fn register(
        &mut self,
        provider: Arc<dyn CloudAccessProvider>,
    ) -> Option<Arc<dyn CloudAccessProvider>> {
        let tag = provider.provider_tag().to_string();
        self.providers.insert(tag, provider)
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn CloudAccessProvider>> {
        self.providers.get(tag).cloned()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for CloudProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("CloudProviderRegistry")
            .field("providers", &tags)
            .finish()
    }
}
