//! File-based locking for collection documents
//!
//! Each collection document is guarded by a sibling lock file holding the
//! lock owner, a verification token, and a TTL. Acquisition waits up to a
//! bounded timeout and clears stale locks left behind by dead holders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::error::{StorageError, StorageResult};

/// On-disk lock record guarding one collection document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionLock {
    /// Collection the lock guards
    pub collection: String,
    /// Lock holder identifier
    pub holder: String,
    /// When the lock was acquired
    pub acquired_at: DateTime<Utc>,
    /// Time to live in seconds
    pub ttl_secs: u64,
    /// Lock token for verification
    pub token: String,
}

impl CollectionLock {
    /// Create a new collection lock
    pub fn new(collection: &str, holder: &str, ttl: Duration) -> Self {
        Self {
            collection: collection.to_string(),
            holder: holder.to_string(),
            acquired_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
            token: Uuid::new_v4().to_string(),
        }
    }

    /// Check if the lock has expired
    pub fn is_expired(&self) -> bool {
        let expiry = self.acquired_at + chrono::Duration::seconds(self.ttl_secs as i64);
        Utc::now() > expiry
    }
}

/// Guard that removes the lock file when released or dropped
pub struct CollectionLockGuard {
    lock: CollectionLock,
    lock_file: PathBuf,
    released: bool,
}

impl CollectionLockGuard {
    fn new(lock: CollectionLock, lock_file: PathBuf) -> Self {
        Self {
            lock,
            lock_file,
            released: false,
        }
    }

    /// Get the lock information
    pub fn lock_info(&self) -> &CollectionLock {
        &self.lock
    }

    /// Explicitly release the lock
    pub fn release(mut self) -> StorageResult<()> {
        self.released = true;
        std::fs::remove_file(&self.lock_file)
            .map_err(|e| StorageError::lock(format!("failed to release lock: {e}")))
    }
}

impl Drop for CollectionLockGuard {
    fn drop(&mut self) {
        // Best-effort cleanup in drop
        if !self.released {
            let _ = std::fs::remove_file(&self.lock_file);
        }
    }
}

/// Acquire the collection lock, waiting up to `timeout`
pub async fn acquire(
    lock_file: &Path,
    collection: &str,
    holder: &str,
    ttl: Duration,
    timeout: Duration,
) -> StorageResult<CollectionLockGuard> {
    let deadline = tokio::time::Instant::now() + timeout;
    let retry_delay = Duration::from_millis(50);

    loop {
        if let Some(guard) = try_acquire(lock_file, collection, holder, ttl)? {
            return Ok(guard);
        }

        clear_if_stale(lock_file)?;

        if tokio::time::Instant::now() >= deadline {
            return Err(StorageError::Timeout(timeout));
        }
        tokio::time::sleep(retry_delay).await;
    }
}

fn try_acquire(
    lock_file: &Path,
    collection: &str,
    holder: &str,
    ttl: Duration,
) -> StorageResult<Option<CollectionLockGuard>> {
    let lock = CollectionLock::new(collection, holder, ttl);

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_file)
    {
        Ok(file) => {
            serde_json::to_writer(&file, &lock)?;
            Ok(Some(CollectionLockGuard::new(lock, lock_file.to_path_buf())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn clear_if_stale(lock_file: &Path) -> StorageResult<()> {
    let contents = match std::fs::read_to_string(lock_file) {
        Ok(contents) => contents,
        // Holder released between our attempt and this read
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<CollectionLock>(&contents) {
        Ok(lock) if lock.is_expired() => {
            warn!(
                holder = %lock.holder,
                collection = %lock.collection,
                "clearing expired collection lock"
            );
            let _ = std::fs::remove_file(lock_file);
        }
        Ok(_) => {}
        Err(_) => {
            // Unreadable lock files are treated as stale
            let _ = std::fs::remove_file(lock_file);
        }
    }
    Ok(())
}
