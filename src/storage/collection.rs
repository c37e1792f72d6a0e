//! Versioned JSON collection documents with atomic persistence
//!
//! Each collection (waves, signals, vendor records) is one logical document.
//! Every mutation is a full read-modify-write executed under an in-process
//! writer mutex plus the on-disk collection lock, then persisted atomically
//! via a temp file and rename so partial writes never land.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

use super::error::StorageResult;
use super::lock;

/// One logical collection persisted as a single JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument<T> {
    pub schema_version: u32,
    pub last_updated: DateTime<Utc>,
    pub items: Vec<T>,
}

impl<T> CollectionDocument<T> {
    /// Create an empty document at the given schema version
    pub fn empty(schema_version: u32) -> Self {
        Self {
            schema_version,
            last_updated: Utc::now(),
            items: Vec::new(),
        }
    }
}

/// Read-modify-write store for one collection document
pub struct JsonCollectionStore<T> {
    name: String,
    path: PathBuf,
    lock_file: PathBuf,
    schema_version: u32,
    lock_ttl: Duration,
    lock_timeout: Duration,
    writer: Mutex<()>,
    holder: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollectionStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Open (or initialize) the store for a named collection under `root`
    pub fn new(
        root: &Path,
        name: &str,
        schema_version: u32,
        lock_timeout: Duration,
    ) -> StorageResult<Self> {
        std::fs::create_dir_all(root)?;

        Ok(Self {
            name: name.to_string(),
            path: root.join(format!("{name}.json")),
            lock_file: root.join(format!("{name}.lock")),
            schema_version,
            lock_ttl: Duration::from_secs(30),
            lock_timeout,
            writer: Mutex::new(()),
            holder: format!("cadence-{}", std::process::id()),
            _marker: PhantomData,
        })
    }

    /// Load the collection document, or an empty one when none exists yet
    pub fn read(&self) -> StorageResult<CollectionDocument<T>> {
        if !self.path.exists() {
            return Ok(CollectionDocument::empty(self.schema_version));
        }

        let contents = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                // Back up the corrupted document and start fresh
                let backup = self
                    .path
                    .with_extension(format!("json.corrupted.{}", Utc::now().timestamp()));
                std::fs::rename(&self.path, &backup)?;
                warn!(
                    collection = %self.name,
                    backup = %backup.display(),
                    error = %e,
                    "collection document corrupted, backed up and reset"
                );
                Ok(CollectionDocument::empty(self.schema_version))
            }
        }
    }

    /// Run a fallible mutation under the collection lock. The document is
    /// persisted only when the closure succeeds, so failed lookups and
    /// rejected transitions leave the file untouched.
    pub async fn update<R, E, F>(&self, f: F) -> StorageResult<Result<R, E>>
    where
        F: FnOnce(&mut CollectionDocument<T>) -> Result<R, E>,
    {
        let _writer = self.writer.lock().await;
        let guard = lock::acquire(
            &self.lock_file,
            &self.name,
            &self.holder,
            self.lock_ttl,
            self.lock_timeout,
        )
        .await?;

        let mut doc = self.read()?;
        let outcome = f(&mut doc);

        if outcome.is_ok() {
            doc.last_updated = Utc::now();
            self.persist(&doc)?;
        }

        guard.release()?;
        Ok(outcome)
    }

    fn persist(&self, doc: &CollectionDocument<T>) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(doc)?;
        let temp_file = self.path.with_extension("json.tmp");
        std::fs::write(&temp_file, json)?;
        std::fs::rename(&temp_file, &self.path)?;
        Ok(())
    }
}
