//! The cache facade: index plus entry store

use crate::atomic::sweep_orphaned_tmp;
use crate::entry::{EntryMetadata, EntryStore};
use crate::index::{Index, IndexRecord};
use crate::key::{CacheKey, derive_key};
use crate::paths::{CacheConfig, INDEX_FILE};
use crate::{Lookup, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Origin response fields stored alongside a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    /// Origin status code
    pub status_code: u16,
    /// Origin `Content-Type`
    pub content_type: String,
    /// Origin response headers
    pub headers: BTreeMap<String, String>,
}

/// A cache hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// Stored metadata
    pub metadata: EntryMetadata,
    /// Stored body
    pub content: Vec<u8>,
}

/// Public listing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEntry {
    /// Cached URL
    pub url: String,
    /// Body size in bytes
    pub byte_size: u64,
}

/// Handle to an initialized cache directory
///
/// Cloning is cheap; all clones share the same index. The process running
/// the cache must be the only writer to its directory.
#[derive(Debug, Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

#[derive(Debug)]
struct CacheInner {
    entries: EntryStore,
    index: Mutex<Index>,
    // Held across artifact writes so concurrent sets never share a `.tmp` sibling
    writes: Mutex<()>,
}

impl Cache {
    /// Open the cache at `config.root`
    ///
    /// Sweeps temp files left by an interrupted write, then loads the index
    /// (creating it in a fresh directory). Call once per directory before
    /// serving any lookups.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be prepared or the existing
    /// index is unreadable
    pub async fn initialize(config: &CacheConfig) -> Result<Self> {
        let root = config.root.clone();
        let entries_dir = config.entries_dir();

        // The root may be a user-chosen directory; only sweep names the cache writes
        let swept = sweep_orphaned_tmp(&root, |name| name == INDEX_FILE).await?
            + sweep_orphaned_tmp(&entries_dir, EntryStore::is_artifact_name).await?;
        let index = Index::load(&root).await?;

        info!(
            root = %root.display(),
            entries = index.len(),
            swept,
            "Cache initialized"
        );

        Ok(Self {
            inner: Arc::new(CacheInner {
                entries: EntryStore::new(entries_dir),
                index: Mutex::new(index),
                writes: Mutex::new(()),
            }),
        })
    }

    /// Look up `url`
    ///
    /// Not a pure read: when the index lists the URL but its artifacts are
    /// gone or inconsistent, the stale record is removed (and the index
    /// persisted) before reporting [`Lookup::Absent`].
    ///
    /// # Errors
    ///
    /// Returns error on I/O failures other than missing artifacts, or if
    /// persisting the repaired index fails
    #[instrument(skip(self), fields(key))]
    pub async fn get(&self, url: &str) -> Result<Lookup<CachedResponse>> {
        let key = derive_key(url);
        tracing::Span::current().record("key", tracing::field::display(&key));

        let Some(record) = self.inner.index.lock().await.get(&key).cloned() else {
            debug!("Cache miss");
            return Ok(Lookup::Absent);
        };

        match self.inner.entries.read(&key).await? {
            Lookup::Found(entry) => {
                debug!(bytes = entry.content.len(), "Cache hit");
                Ok(Lookup::Found(CachedResponse {
                    metadata: entry.metadata,
                    content: entry.content,
                }))
            }
            Lookup::Absent => {
                if self.remove_if_unchanged(&key, &record).await? {
                    warn!("Index record had no usable artifacts; removed it");
                }
                Ok(Lookup::Absent)
            }
        }
    }

    /// Drop the record for `key` only if it still equals `seen`
    ///
    /// A concurrent set may have replaced the record since it was read.
    async fn remove_if_unchanged(&self, key: &CacheKey, seen: &IndexRecord) -> Result<bool> {
        let mut index = self.inner.index.lock().await;
        if index.get(key) != Some(seen) {
            return Ok(false);
        }
        index.remove(key).await?;
        Ok(true)
    }

    /// Store `content` for `url`
    ///
    /// Artifacts are written before the index references them, so a crash in
    /// between leaves an unreachable entry rather than a dangling record.
    ///
    /// # Errors
    ///
    /// Returns error if writing the artifacts or persisting the index fails
    #[instrument(skip(self, descriptor, content), fields(key, bytes = content.len()))]
    pub async fn set(
        &self,
        url: &str,
        descriptor: &ResponseDescriptor,
        content: &[u8],
    ) -> Result<IndexRecord> {
        let key = derive_key(url);
        tracing::Span::current().record("key", tracing::field::display(&key));

        let cached_at = Utc::now();
        let byte_size = content.len() as u64;
        let metadata = EntryMetadata {
            url: url.to_string(),
            hash: key.to_string(),
            content_type: descriptor.content_type.clone(),
            status_code: descriptor.status_code,
            byte_size,
            cached_at,
            headers: descriptor.headers.clone(),
        };
        let record = IndexRecord {
            url: url.to_string(),
            byte_size,
            cached_at,
        };

        let _writing = self.inner.writes.lock().await;
        self.inner.entries.write(&key, content, &metadata).await?;
        self.inner
            .index
            .lock()
            .await
            .put(key, record.clone())
            .await?;

        debug!("Stored cache entry");
        Ok(record)
    }

    /// Every indexed URL with its size, without touching entry files
    pub async fn list(&self) -> Vec<ListedEntry> {
        self.inner
            .index
            .lock()
            .await
            .snapshot()
            .into_iter()
            .map(|(_, record)| ListedEntry {
                url: record.url,
                byte_size: record.byte_size,
            })
            .collect()
    }
}
