//! Non-persistent [`AudioStore`] and environment probes.
//!
//! Used by hosts without durable storage and by tests that need to observe or
//! break the storage layer.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::storage::{
    AudioStore, AudioStoreOpener, MetadataRecord, StoredAudio, StoredMetadata, StoredWaveform,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Keyspaces {
    audio: HashMap<String, StoredAudio>,
    metadata: HashMap<String, StoredMetadata>,
    waveforms: HashMap<String, StoredWaveform>,
}

/// Audio store kept in process memory.
///
/// All keyspaces sit behind one lock so multi-keyspace writes are atomic.
#[derive(Default)]
pub struct InMemoryAudioStore {
    keyspaces: Mutex<Keyspaces>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    audio_reads: AtomicUsize,
}

impl InMemoryAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with a storage error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_audio` calls served so far.
    pub fn audio_reads(&self) -> usize {
        self.audio_reads.load(Ordering::SeqCst)
    }

    pub fn audio_len(&self) -> usize {
        self.keyspaces.lock().audio.len()
    }

    pub fn waveform_len(&self) -> usize {
        self.keyspaces.lock().waveforms.len()
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BridgeError::StorageError("read failure injected".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BridgeError::StorageError("write failure injected".to_string()));
        }
        Ok(())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AudioStore for InMemoryAudioStore {
    async fn put_audio(&self, audio: StoredAudio, metadata: StoredMetadata) -> Result<()> {
        self.check_write()?;
        let mut keyspaces = self.keyspaces.lock();
        keyspaces.metadata.insert(audio.track_id.clone(), metadata);
        keyspaces.audio.insert(audio.track_id.clone(), audio);
        Ok(())
    }

    async fn get_audio(&self, track_id: &str) -> Result<Option<StoredAudio>> {
        self.audio_reads.fetch_add(1, Ordering::SeqCst);
        self.check_read()?;
        Ok(self.keyspaces.lock().audio.get(track_id).cloned())
    }

    async fn touch(&self, track_id: &str, accessed_at: i64) -> Result<()> {
        self.check_write()?;
        if let Some(metadata) = self.keyspaces.lock().metadata.get_mut(track_id) {
            metadata.last_accessed_at = accessed_at;
        }
        Ok(())
    }

    async fn get_metadata(&self, track_id: &str) -> Result<Option<StoredMetadata>> {
        self.check_read()?;
        Ok(self.keyspaces.lock().metadata.get(track_id).copied())
    }

    async fn list_metadata(&self) -> Result<Vec<MetadataRecord>> {
        self.check_read()?;
        let keyspaces = self.keyspaces.lock();
        let mut records: Vec<MetadataRecord> = keyspaces
            .metadata
            .iter()
            .map(|(track_id, metadata)| MetadataRecord {
                track_id: track_id.clone(),
                metadata: *metadata,
            })
            .collect();
        records.sort_by(|a, b| {
            a.metadata
                .last_accessed_at
                .cmp(&b.metadata.last_accessed_at)
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
        Ok(records)
    }

    async fn put_waveform(&self, waveform: StoredWaveform) -> Result<()> {
        self.check_write()?;
        self.keyspaces
            .lock()
            .waveforms
            .insert(waveform.track_id.clone(), waveform);
        Ok(())
    }

    async fn get_waveform(&self, track_id: &str) -> Result<Option<StoredWaveform>> {
        self.check_read()?;
        Ok(self.keyspaces.lock().waveforms.get(track_id).cloned())
    }

    async fn remove(&self, track_id: &str) -> Result<()> {
        self.check_write()?;
        let mut keyspaces = self.keyspaces.lock();
        keyspaces.audio.remove(track_id);
        keyspaces.metadata.remove(track_id);
        keyspaces.waveforms.remove(track_id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check_write()?;
        let mut keyspaces = self.keyspaces.lock();
        keyspaces.audio.clear();
        keyspaces.metadata.clear();
        keyspaces.waveforms.clear();
        Ok(())
    }
}

/// Opener that always hands out the same in-memory store.
pub struct InMemoryStoreOpener {
    store: Arc<InMemoryAudioStore>,
    opens: AtomicUsize,
}

impl InMemoryStoreOpener {
    pub fn new(store: Arc<InMemoryAudioStore>) -> Self {
        Self {
            store,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> Arc<InMemoryAudioStore> {
        Arc::clone(&self.store)
    }

    /// How many times `open` was called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStoreOpener {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryAudioStore::new()))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AudioStoreOpener for InMemoryStoreOpener {
    async fn open(&self) -> Result<Option<Arc<dyn AudioStore>>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.store.clone() as Arc<dyn AudioStore>))
    }
}

/// Probe for environments with no persistent storage at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStoreOpener;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl AudioStoreOpener for UnavailableStoreOpener {
    async fn open(&self) -> Result<Option<Arc<dyn AudioStore>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn audio(track_id: &str, data: &'static [u8]) -> (StoredAudio, StoredMetadata) {
        (
            StoredAudio {
                track_id: track_id.to_string(),
                data: Bytes::from_static(data),
                stored_at: 1,
            },
            StoredMetadata {
                last_accessed_at: 1,
                size_bytes: data.len() as u64,
            },
        )
    }

    #[tokio::test]
    async fn test_remove_clears_every_keyspace() {
        let store = InMemoryAudioStore::new();
        let (entry, metadata) = audio("t1", b"abc");
        store.put_audio(entry, metadata).await.unwrap();
        store
            .put_waveform(StoredWaveform {
                track_id: "t1".to_string(),
                samples: vec![0.5],
                stored_at: 1,
            })
            .await
            .unwrap();

        store.remove("t1").await.unwrap();
        store.remove("t1").await.unwrap();

        assert_eq!(store.audio_len(), 0);
        assert_eq!(store.waveform_len(), 0);
        assert!(store.get_metadata("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_metadata_oldest_first() {
        let store = InMemoryAudioStore::new();
        for (id, at) in [("new", 30), ("old", 10), ("mid", 20)] {
            let (entry, mut metadata) = audio(id, b"x");
            metadata.last_accessed_at = at;
            store.put_audio(entry, metadata).await.unwrap();
        }

        let order: Vec<String> = store
            .list_metadata()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.track_id)
            .collect();
        assert_eq!(order, vec!["old", "mid", "new"]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryAudioStore::new();
        store.set_fail_writes(true);
        let (entry, metadata) = audio("t1", b"abc");
        assert!(store.put_audio(entry, metadata).await.is_err());

        store.set_fail_reads(true);
        assert!(store.get_audio("t1").await.is_err());
        assert_eq!(store.audio_reads(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_opener() {
        assert!(UnavailableStoreOpener.open().await.unwrap().is_none());
    }
}
