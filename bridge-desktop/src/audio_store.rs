//! Audio cache storage using SQLite
//!
//! Three tables mirror the three keyspaces of the browser store:
//! `audio_files`, `metadata` (indexed on `last_accessed_at` for LRU scans)
//! and `waveforms`. Multi-table writes run inside one transaction.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{
        AudioStore, AudioStoreOpener, MetadataRecord, StoredAudio, StoredMetadata, StoredWaveform,
    },
};
use bytes::Bytes;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS audio_files (
        track_id TEXT PRIMARY KEY,
        data BLOB NOT NULL,
        stored_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        track_id TEXT PRIMARY KEY,
        last_accessed_at INTEGER NOT NULL,
        size_bytes INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metadata_last_accessed ON metadata (last_accessed_at)",
    "CREATE INDEX IF NOT EXISTS idx_metadata_size ON metadata (size_bytes)",
    r#"
    CREATE TABLE IF NOT EXISTS waveforms (
        track_id TEXT PRIMARY KEY,
        samples TEXT NOT NULL,
        stored_at INTEGER NOT NULL
    )
    "#,
];

fn db_error(context: &str, e: sqlx::Error) -> BridgeError {
    BridgeError::StorageError(format!("{}: {}", context, e))
}

/// SQLite-backed [`AudioStore`].
pub struct SqliteAudioStore {
    pool: SqlitePool,
}

impl SqliteAudioStore {
    /// Open (creating if needed) the database file at `db_path`.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to DB", e))?;

        let store = Self::from_pool(pool).await?;
        debug!(path = ?db_path, "Initialized audio store");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// Each SQLite in-memory connection is its own database, so the pool is
    /// limited to a single connection.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| db_error("Failed to connect to DB", e))?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| db_error("Failed to create schema", e))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl AudioStore for SqliteAudioStore {
    async fn put_audio(&self, audio: StoredAudio, metadata: StoredMetadata) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO audio_files (track_id, data, stored_at)
            VALUES (?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                data = excluded.data,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(&audio.track_id)
        .bind(audio.data.as_ref())
        .bind(audio.stored_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to store audio", e))?;

        sqlx::query(
            r#"
            INSERT INTO metadata (track_id, last_accessed_at, size_bytes)
            VALUES (?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                last_accessed_at = excluded.last_accessed_at,
                size_bytes = excluded.size_bytes
            "#,
        )
        .bind(&audio.track_id)
        .bind(metadata.last_accessed_at)
        .bind(metadata.size_bytes as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to store metadata", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        debug!(
            track_id = %audio.track_id,
            bytes = metadata.size_bytes,
            "Stored audio"
        );
        Ok(())
    }

    async fn get_audio(&self, track_id: &str) -> Result<Option<StoredAudio>> {
        let row = sqlx::query("SELECT data, stored_at FROM audio_files WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read audio", e))?;

        Ok(row.map(|row| {
            let data: Vec<u8> = row.get(0);
            StoredAudio {
                track_id: track_id.to_string(),
                data: Bytes::from(data),
                stored_at: row.get(1),
            }
        }))
    }

    async fn touch(&self, track_id: &str, accessed_at: i64) -> Result<()> {
        sqlx::query("UPDATE metadata SET last_accessed_at = ? WHERE track_id = ?")
            .bind(accessed_at)
            .bind(track_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to update access time", e))?;
        Ok(())
    }

    async fn get_metadata(&self, track_id: &str) -> Result<Option<StoredMetadata>> {
        let row =
            sqlx::query("SELECT last_accessed_at, size_bytes FROM metadata WHERE track_id = ?")
                .bind(track_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read metadata", e))?;

        Ok(row.map(|row| StoredMetadata {
            last_accessed_at: row.get(0),
            size_bytes: row.get::<i64, _>(1).max(0) as u64,
        }))
    }

    async fn list_metadata(&self) -> Result<Vec<MetadataRecord>> {
        let rows = sqlx::query(
            "SELECT track_id, last_accessed_at, size_bytes FROM metadata ORDER BY last_accessed_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to scan metadata", e))?;

        Ok(rows
            .into_iter()
            .map(|row| MetadataRecord {
                track_id: row.get(0),
                metadata: StoredMetadata {
                    last_accessed_at: row.get(1),
                    size_bytes: row.get::<i64, _>(2).max(0) as u64,
                },
            })
            .collect())
    }

    async fn put_waveform(&self, waveform: StoredWaveform) -> Result<()> {
        let samples = serde_json::to_string(&waveform.samples).map_err(|e| {
            BridgeError::StorageError(format!("Failed to encode waveform: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO waveforms (track_id, samples, stored_at)
            VALUES (?, ?, ?)
            ON CONFLICT(track_id) DO UPDATE SET
                samples = excluded.samples,
                stored_at = excluded.stored_at
            "#,
        )
        .bind(&waveform.track_id)
        .bind(samples)
        .bind(waveform.stored_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store waveform", e))?;

        Ok(())
    }

    async fn get_waveform(&self, track_id: &str) -> Result<Option<StoredWaveform>> {
        let row = sqlx::query("SELECT samples, stored_at FROM waveforms WHERE track_id = ?")
            .bind(track_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read waveform", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let encoded: String = row.get(0);
        let samples: Vec<f32> = serde_json::from_str(&encoded).map_err(|e| {
            BridgeError::StorageError(format!("Corrupt waveform for {}: {}", track_id, e))
        })?;

        Ok(Some(StoredWaveform {
            track_id: track_id.to_string(),
            samples,
            stored_at: row.get(1),
        }))
    }

    async fn remove(&self, track_id: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        for table in ["audio_files", "metadata", "waveforms"] {
            sqlx::query(&format!("DELETE FROM {} WHERE track_id = ?", table))
                .bind(track_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to delete entry", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        debug!(track_id = track_id, "Removed cached entry");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        for table in ["audio_files", "metadata", "waveforms"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to clear table", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        debug!("Cleared audio store");
        Ok(())
    }
}

/// Opens a [`SqliteAudioStore`] at a fixed path on first use.
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    path: PathBuf,
}

impl SqliteStoreOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AudioStoreOpener for SqliteStoreOpener {
    async fn open(&self) -> Result<Option<Arc<dyn AudioStore>>> {
        let store = SqliteAudioStore::open(&self.path).await?;
        Ok(Some(Arc::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(track_id: &str, data: &'static [u8], stored_at: i64) -> StoredAudio {
        StoredAudio {
            track_id: track_id.to_string(),
            data: Bytes::from_static(data),
            stored_at,
        }
    }

    fn metadata(last_accessed_at: i64, size_bytes: u64) -> StoredMetadata {
        StoredMetadata {
            last_accessed_at,
            size_bytes,
        }
    }

    #[tokio::test]
    async fn test_put_and_get_audio() {
        let store = SqliteAudioStore::in_memory().await.unwrap();

        store
            .put_audio(audio("t1", b"abc", 10), metadata(10, 3))
            .await
            .unwrap();

        let stored = store.get_audio("t1").await.unwrap().unwrap();
        assert_eq!(stored.data.as_ref(), b"abc");
        assert_eq!(stored.stored_at, 10);
        assert_eq!(
            store.get_metadata("t1").await.unwrap(),
            Some(metadata(10, 3))
        );
        assert!(store.get_audio("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_bytes_and_size() {
        let store = SqliteAudioStore::in_memory().await.unwrap();

        store
            .put_audio(audio("t1", b"abc", 10), metadata(10, 3))
            .await
            .unwrap();
        store
            .put_audio(audio("t1", b"abcdef", 20), metadata(20, 6))
            .await
            .unwrap();

        let stored = store.get_audio("t1").await.unwrap().unwrap();
        assert_eq!(stored.data.as_ref(), b"abcdef");
        assert_eq!(store.list_metadata().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_touch_updates_access_time_only_for_existing_rows() {
        let store = SqliteAudioStore::in_memory().await.unwrap();
        store
            .put_audio(audio("t1", b"a", 10), metadata(10, 1))
            .await
            .unwrap();

        store.touch("t1", 99).await.unwrap();
        store.touch("ghost", 99).await.unwrap();

        assert_eq!(
            store.get_metadata("t1").await.unwrap(),
            Some(metadata(99, 1))
        );
        assert!(store.get_metadata("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_metadata_is_oldest_first() {
        let store = SqliteAudioStore::in_memory().await.unwrap();
        store
            .put_audio(audio("new", b"a", 30), metadata(30, 1))
            .await
            .unwrap();
        store
            .put_audio(audio("old", b"bb", 10), metadata(10, 2))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_metadata()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.track_id)
            .collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn test_waveform_round_trip() {
        let store = SqliteAudioStore::in_memory().await.unwrap();
        store
            .put_waveform(StoredWaveform {
                track_id: "t1".to_string(),
                samples: vec![0.0, 0.5, 1.0],
                stored_at: 5,
            })
            .await
            .unwrap();

        let waveform = store.get_waveform("t1").await.unwrap().unwrap();
        assert_eq!(waveform.samples, vec![0.0, 0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_remove_deletes_every_keyspace() {
        let store = SqliteAudioStore::in_memory().await.unwrap();
        store
            .put_audio(audio("t1", b"abc", 10), metadata(10, 3))
            .await
            .unwrap();
        store
            .put_waveform(StoredWaveform {
                track_id: "t1".to_string(),
                samples: vec![0.1],
                stored_at: 10,
            })
            .await
            .unwrap();

        store.remove("t1").await.unwrap();
        store.remove("t1").await.unwrap();

        assert!(store.get_audio("t1").await.unwrap().is_none());
        assert!(store.get_metadata("t1").await.unwrap().is_none());
        assert!(store.get_waveform("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = SqliteAudioStore::in_memory().await.unwrap();
        store
            .put_audio(audio("t1", b"abc", 10), metadata(10, 3))
            .await
            .unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.list_metadata().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_opener_creates_database_file() {
        let dir = std::env::temp_dir().join(format!("beatshelf-store-{}", uuid::Uuid::new_v4()));
        let opener = SqliteStoreOpener::new(dir.join("audio-cache.db"));

        let store = opener.open().await.unwrap().expect("store should open");
        store
            .put_audio(audio("t1", b"abc", 1), metadata(1, 3))
            .await
            .unwrap();
        assert!(opener.path().exists());

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
