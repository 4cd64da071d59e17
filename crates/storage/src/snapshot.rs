//! Versioned snapshot persistence
//!
//! This module persists a single piece of application state as a JSON
//! snapshot file. Snapshots carry a schema version and an md5 checksum
//! so a torn or hand-edited file is detected on load instead of being
//! deserialized into garbage. Writes go through a temp file and rename
//! so a crash mid-write cannot corrupt the previous snapshot.
//!
//! The session snapshot (`auth-storage`) is the primary consumer: the
//! signed-in user and the authenticated flag are written together as
//! one unit and hydrated at process start.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Snapshot error types
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot not loaded yet
    #[error("Snapshot not loaded")]
    NotLoaded,

    /// Corruption detected
    #[error("Corruption detected: {0}")]
    Corrupt(String),

    /// Version mismatch
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// On-disk snapshot envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope<T> {
    version: u32,
    checksum: String,
    data: T,
}

impl<T: Serialize> SnapshotEnvelope<T> {
    fn new(version: u32, data: T) -> Result<Self> {
        let data_json = serde_json::to_string(&data)?;
        let checksum = format!("{:x}", md5::compute(&data_json));

        Ok(Self { version, checksum, data })
    }

    fn verify_checksum(&self) -> Result<()> {
        let data_json = serde_json::to_string(&self.data)?;
        let computed = format!("{:x}", md5::compute(&data_json));

        if computed != self.checksum {
            return Err(SnapshotError::Corrupt(format!(
                "Checksum mismatch: expected {}, got {}",
                self.checksum, computed
            )));
        }

        Ok(())
    }
}

/// Snapshot configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Path to the snapshot file
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Write through a temp file and rename
    pub atomic_writes: bool,
}

impl SnapshotConfig {
    /// Create a new configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: 1,
            atomic_writes: true,
        }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// Persisted snapshot manager
///
/// Holds the current snapshot in memory behind a lock and mirrors every
/// change to disk. `load` must run before reads or writes; a missing
/// file hydrates to `T::default()`.
pub struct SnapshotStore<T> {
    config: SnapshotConfig,
    state: Arc<RwLock<Option<T>>>,
}

impl<T> SnapshotStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Default,
{
    /// Create a new snapshot store
    pub fn new(config: SnapshotConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// Load the snapshot from disk, defaulting when the file is missing
    pub async fn load(&self) -> Result<()> {
        match self.read_from_disk().await {
            Ok(data) => {
                let mut state = self.state.write().await;
                *state = Some(data);
                Ok(())
            }
            Err(SnapshotError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut state = self.state.write().await;
                *state = Some(T::default());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Get a clone of the current snapshot
    pub async fn get(&self) -> Result<T> {
        let state = self.state.read().await;
        state.clone().ok_or(SnapshotError::NotLoaded)
    }

    /// Replace the snapshot and persist it
    pub async fn set(&self, new_state: T) -> Result<()> {
        let mut state = self.state.write().await;
        *state = Some(new_state.clone());
        self.write_to_disk(&new_state).await
    }

    /// Mutate the snapshot in place and persist the result
    pub async fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let mut state = self.state.write().await;

        match state.as_mut() {
            Some(current) => {
                f(current);
                self.write_to_disk(current).await
            }
            None => Err(SnapshotError::NotLoaded),
        }
    }

    /// Reset the snapshot to its default and delete the file
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = Some(T::default());

        match fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_from_disk(&self) -> Result<T> {
        let contents = fs::read_to_string(&self.config.path).await?;

        let envelope: SnapshotEnvelope<T> = serde_json::from_str(&contents)?;

        envelope.verify_checksum()?;

        if envelope.version != self.config.version {
            return Err(SnapshotError::VersionMismatch {
                expected: self.config.version,
                found: envelope.version,
            });
        }

        Ok(envelope.data)
    }

    async fn write_to_disk(&self, data: &T) -> Result<()> {
        let envelope = SnapshotEnvelope::new(self.config.version, data.clone())?;
        let json = serde_json::to_string_pretty(&envelope)?;

        if self.config.atomic_writes {
            let tmp_path = self.config.path.with_extension("tmp");
            fs::write(&tmp_path, &json).await?;
            fs::rename(&tmp_path, &self.config.path).await?;
        } else {
            fs::write(&self.config.path, json).await?;
        }

        tracing::debug!(path = %self.config.path.display(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestSnapshot {
        name: String,
        signed_in: bool,
    }

    #[tokio::test]
    async fn test_load_missing_file_defaults() {
        let dir = TempDir::new().unwrap();
        let store: SnapshotStore<TestSnapshot> =
            SnapshotStore::new(SnapshotConfig::new(dir.path().join("state.json")));

        store.load().await.unwrap();
        assert_eq!(store.get().await.unwrap(), TestSnapshot::default());
    }

    #[tokio::test]
    async fn test_get_before_load_fails() {
        let dir = TempDir::new().unwrap();
        let store: SnapshotStore<TestSnapshot> =
            SnapshotStore::new(SnapshotConfig::new(dir.path().join("state.json")));

        let result = store.get().await;
        assert!(matches!(result, Err(SnapshotError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        {
            let store: SnapshotStore<TestSnapshot> =
                SnapshotStore::new(SnapshotConfig::new(&path));
            store.load().await.unwrap();
            store
                .set(TestSnapshot { name: "amina".to_string(), signed_in: true })
                .await
                .unwrap();
        }

        {
            let store: SnapshotStore<TestSnapshot> =
                SnapshotStore::new(SnapshotConfig::new(&path));
            store.load().await.unwrap();
            let state = store.get().await.unwrap();
            assert_eq!(state.name, "amina");
            assert!(state.signed_in);
        }
    }

    #[tokio::test]
    async fn test_update_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store: SnapshotStore<TestSnapshot> = SnapshotStore::new(SnapshotConfig::new(&path));
        store.load().await.unwrap();
        store.update(|s| s.signed_in = true).await.unwrap();

        let reloaded: SnapshotStore<TestSnapshot> = SnapshotStore::new(SnapshotConfig::new(&path));
        reloaded.load().await.unwrap();
        assert!(reloaded.get().await.unwrap().signed_in);
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store: SnapshotStore<TestSnapshot> = SnapshotStore::new(SnapshotConfig::new(&path));
        store.load().await.unwrap();
        store
            .set(TestSnapshot { name: "amina".to_string(), signed_in: true })
            .await
            .unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.get().await.unwrap(), TestSnapshot::default());

        // Clearing again is a no-op
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_tampered_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store: SnapshotStore<TestSnapshot> = SnapshotStore::new(SnapshotConfig::new(&path));
        store.load().await.unwrap();
        store
            .set(TestSnapshot { name: "amina".to_string(), signed_in: true })
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("amina", "mallory")).unwrap();

        let reloaded: SnapshotStore<TestSnapshot> = SnapshotStore::new(SnapshotConfig::new(&path));
        let result = reloaded.load().await;
        assert!(matches!(result, Err(SnapshotError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let v1: SnapshotStore<TestSnapshot> =
            SnapshotStore::new(SnapshotConfig::new(&path).version(1));
        v1.load().await.unwrap();
        v1.set(TestSnapshot { name: "amina".to_string(), signed_in: true })
            .await
            .unwrap();

        let v2: SnapshotStore<TestSnapshot> =
            SnapshotStore::new(SnapshotConfig::new(&path).version(2));
        let result = v2.load().await;
        assert!(matches!(
            result,
            Err(SnapshotError::VersionMismatch { expected: 2, found: 1 })
        ));
    }
}
