//! In-memory storage, for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::{FeedStore, SeenLedger};

/// Storage backend holding documents in a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    ledgers: Mutex<HashMap<String, SeenLedger>>,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose feed writes always fail.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Seed a document.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(key.to_string(), bytes.into());
        }
    }

    /// Current contents of a document as text.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let files = self.files.lock().ok()?;
        files
            .get(key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn ledger(&self, key: &str) -> Option<SeenLedger> {
        self.ledgers.lock().ok()?.get(key).cloned()
    }
}

fn poisoned() -> AppError {
    AppError::Io(std::io::Error::other("memory storage lock poisoned"))
}

#[async_trait]
impl FeedStore for MemoryStorage {
    async fn read_feed(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    async fn write_feed(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::Io(std::io::Error::other("write refused")));
        }
        self.files
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load_seen(&self, key: &str) -> Result<SeenLedger> {
        Ok(self
            .ledgers
            .lock()
            .map_err(|_| poisoned())?
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_seen(&self, key: &str, ledger: &SeenLedger) -> Result<()> {
        self.ledgers
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), ledger.clone());
        Ok(())
    }
}
