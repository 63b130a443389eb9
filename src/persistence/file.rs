//! Directory-of-JSON-files snapshot backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Slot, SnapshotBackend};
use crate::error::StorefrontError;

/// Stores each slot as `<dir>/<slot>.json`.
///
/// Writes go to a temporary sibling file first and are renamed into place,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens (and creates if needed) the snapshot directory.
    ///
    /// # Errors
    ///
    /// Returns a [`StorefrontError::PersistenceError`] if the directory
    /// cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorefrontError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorefrontError::PersistenceError(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    fn slot_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!("{}.json", slot.key()))
    }

    fn temp_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", slot.key()))
    }
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn load(&self, slot: Slot) -> Result<Option<serde_json::Value>, StorefrontError> {
        let path = self.slot_path(slot);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorefrontError::PersistenceError(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            StorefrontError::PersistenceError(format!("corrupt snapshot {}: {e}", path.display()))
        })
    }

    async fn save(&self, slot: Slot, snapshot: &serde_json::Value) -> Result<(), StorefrontError> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| StorefrontError::PersistenceError(e.to_string()))?;
        let tmp = self.temp_path(slot);
        let path = self.slot_path(slot);
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            StorefrontError::PersistenceError(format!("cannot write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            StorefrontError::PersistenceError(format!("cannot replace {}: {e}", path.display()))
        })?;
        tracing::trace!(%slot, bytes = bytes.len(), "slot snapshot written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_slot_loads_as_none() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(backend) = FileBackend::open(dir.path()).await else {
            panic!("open");
        };
        let loaded = backend.load(Slot::Plans).await;
        assert!(matches!(loaded, Ok(None)));
    }

    #[tokio::test]
    async fn save_then_load_returns_snapshot() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(backend) = FileBackend::open(dir.path().join("nested")).await else {
            panic!("open");
        };
        let snapshot = serde_json::json!([{"id": 1}]);
        tokio_test::assert_ok!(backend.save(Slot::Accounts, &snapshot).await);

        let Ok(Some(loaded)) = backend.load(Slot::Accounts).await else {
            panic!("snapshot should exist");
        };
        assert_eq!(loaded, snapshot);
        assert!(!dir.path().join("nested/.accounts.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let Ok(backend) = FileBackend::open(dir.path()).await else {
            panic!("open");
        };
        let _ = tokio::fs::write(dir.path().join("sessions.json"), b"{not json").await;
        assert!(matches!(
            backend.load(Slot::Sessions).await,
            Err(StorefrontError::PersistenceError(_))
        ));
    }
}
