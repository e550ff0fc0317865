use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stockwatch_core::{Snapshot, StateStore};
use tokio::io::AsyncWriteExt;

use crate::error::StateError;

/// Slot file name inside the state directory.
pub const STATE_FILE: &str = "availability_cache.json";

/// Single-slot JSON state store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Build a store without touching the filesystem. Loads from a missing
    /// directory report absence; saves fail until the directory exists.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Build a store and create its directory.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StateError> {
        let store = Self::new(dir);
        tokio::fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir
            .join(format!(".{STATE_FILE}.{}.tmp", std::process::id()))
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, StateError> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StateError::Io(e)),
        }
    }

    /// Write to a temp file in the same directory, sync, then rename over the
    /// slot. Readers see either the old document or the new one.
    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), StateError> {
        let tmp = self.tmp_path();
        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, self.path()).await
        }
        .await;

        if let Err(e) = result {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp state file");
                }
            }
            return Err(StateError::Io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    type Error = StateError;

    async fn load(&self) -> Result<Option<Snapshot>, StateError> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) if snapshot.is_success() => Ok(Some(snapshot)),
            Ok(_) => {
                tracing::warn!(path = %self.path().display(), "stored snapshot is a failure record; ignoring");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(path = %self.path().display(), error = %e, "stored snapshot is unreadable; treating as absent");
                Ok(None)
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StateError> {
        if !snapshot.is_success() {
            return Err(StateError::FailureSnapshot);
        }
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        self.write_atomic(&bytes).await?;
        tracing::debug!(
            path = %self.path().display(),
            stores = snapshot.stores().len(),
            "snapshot saved"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        match tokio::fs::remove_file(self.path()).await {
            Ok(()) => {
                tracing::info!(path = %self.path().display(), "state cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::Io(e)),
        }
    }
}
