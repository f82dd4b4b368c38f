//! Local filesystem storage implementation.
//!
//! Keys are paths relative to the storage root; absolute keys are used as-is.
//! Writes go to a temporary sibling file which is then renamed over the
//! target, so a failed run never leaves a truncated feed behind.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{FeedStore, SeenLedger};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FeedStore for LocalStorage {
    async fn read_feed(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let bytes = self.read_bytes(key).await?;
        if bytes.is_none() {
            log::info!("No previous feed at {}", self.path(key).display());
        }
        Ok(bytes)
    }

    async fn write_feed(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.write_bytes(key, bytes).await?;
        log::info!(
            "Feed written to {} ({} bytes)",
            self.path(key).display(),
            bytes.len()
        );
        Ok(())
    }

    async fn load_seen(&self, key: &str) -> Result<SeenLedger> {
        match self.read_json::<SeenLedger>(key).await? {
            Some(ledger) => Ok(ledger),
            None => {
                log::info!("No seen ledger at {}", self.path(key).display());
                Ok(SeenLedger::default())
            }
        }
    }

    async fn save_seen(&self, key: &str, ledger: &SeenLedger) -> Result<()> {
        self.write_json(key, ledger).await
    }
}
