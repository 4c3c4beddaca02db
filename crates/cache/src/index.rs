//! In-memory index of cached URLs, persisted as `index.json`
//!
//! The document maps each key to a summary record:
//!
//! ```json
//! {
//!   "<key>": { "url": "https://a.example", "byteSize": 5, "cachedAt": "2024-05-01T12:00:00Z" }
//! }
//! ```
//!
//! Every mutation rewrites the whole document with atomic replace before
//! returning.

use crate::atomic::write_atomic;
use crate::key::CacheKey;
use crate::paths::{ENTRIES_DIR, INDEX_FILE};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Summary of one cached entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    /// URL the entry was fetched from
    pub url: String,
    /// Size of the content artifact
    pub byte_size: u64,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
}

/// Key to record map, iterated in insertion order
#[derive(Debug)]
pub struct Index {
    path: PathBuf,
    records: IndexMap<CacheKey, IndexRecord>,
}

impl Index {
    /// Load the index for the cache rooted at `root`
    ///
    /// Creates `<root>/entries/` if needed. A missing index document is
    /// initialized empty and written immediately.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptIndex`] if the document cannot be parsed and
    /// [`Error::Io`] for any other read failure. A broken index is never
    /// replaced with an empty one.
    pub async fn load(root: &Path) -> Result<Self> {
        let entries = root.join(ENTRIES_DIR);
        fs::create_dir_all(&entries)
            .await
            .map_err(|e| Error::io(e, &entries, "create_dir_all"))?;

        let path = root.join(INDEX_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let records = parse_document(&path, &bytes)?;
                info!(path = %path.display(), entries = records.len(), "Loaded cache index");
                Ok(Self { path, records })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let index = Self {
                    path,
                    records: IndexMap::new(),
                };
                index.persist().await?;
                info!(path = %index.path.display(), "Initialized empty cache index");
                Ok(index)
            }
            Err(e) => Err(Error::io(e, &path, "read")),
        }
    }

    /// Path of the index document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full document with atomic replace
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub async fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.records)
            .map_err(|e| Error::serialization(format!("Failed to serialize cache index: {e}")))?;
        write_atomic(&self.path, &json).await?;
        debug!(entries = self.records.len(), "Persisted cache index");
        Ok(())
    }

    /// Record for `key`, if any
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&IndexRecord> {
        self.records.get(key)
    }

    /// Insert or overwrite `key`, then persist
    ///
    /// An overwritten key keeps its position.
    ///
    /// # Errors
    ///
    /// Returns error if persisting fails
    pub async fn put(&mut self, key: CacheKey, record: IndexRecord) -> Result<()> {
        self.records.insert(key, record);
        self.persist().await
    }

    /// Remove `key`, persisting only if it was present
    ///
    /// # Errors
    ///
    /// Returns error if persisting fails
    pub async fn remove(&mut self, key: &CacheKey) -> Result<Option<IndexRecord>> {
        let Some(record) = self.records.shift_remove(key) else {
            return Ok(None);
        };
        self.persist().await?;
        Ok(Some(record))
    }

    /// All records in iteration order
    #[must_use]
    pub fn snapshot(&self) -> Vec<(CacheKey, IndexRecord)> {
        self.records
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index has no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<IndexMap<CacheKey, IndexRecord>> {
    let document: IndexMap<String, IndexRecord> =
        serde_json::from_slice(bytes).map_err(|e| Error::corrupt_index(path, e.to_string()))?;

    document
        .into_iter()
        .map(|(key, record)| {
            CacheKey::from_hex(key)
                .map(|key| (key, record))
                .map_err(|e| Error::corrupt_index(path, e.to_string()))
        })
        .collect()
}
