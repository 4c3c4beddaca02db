//! Per-key entry artifacts
//!
//! Each entry is two files in the entries directory:
//!
//! ```text
//! entries/<key>.content     raw response body
//! entries/<key>.meta.json   EntryMetadata as JSON
//! ```

use crate::atomic::write_atomic;
use crate::key::CacheKey;
use crate::{Error, Lookup, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const CONTENT_EXT: &str = "content";
const META_EXT: &str = "meta.json";

/// Metadata stored next to each cached body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// URL the body was fetched from
    pub url: String,
    /// Cache key of the URL
    pub hash: String,
    /// Origin `Content-Type`
    pub content_type: String,
    /// Origin status code
    pub status_code: u16,
    /// Length of the content artifact
    pub byte_size: u64,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
    /// Origin response headers
    pub headers: BTreeMap<String, String>,
}

/// Both artifacts of an entry, read back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Parsed metadata artifact
    pub metadata: EntryMetadata,
    /// Content artifact bytes
    pub content: Vec<u8>,
}

/// Reads and writes entry artifacts; never touches the index
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
}

impl EntryStore {
    /// Store entries under `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether `name` is an artifact file name (`<key>.content` or
    /// `<key>.meta.json`) this store would write
    #[must_use]
    pub fn is_artifact_name(name: &str) -> bool {
        [CONTENT_EXT, META_EXT].iter().any(|ext| {
            name.strip_suffix(ext)
                .and_then(|rest| rest.strip_suffix('.'))
                .is_some_and(|key| CacheKey::from_hex(key).is_ok())
        })
    }

    /// Path of the content artifact for `key`
    #[must_use]
    pub fn content_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{CONTENT_EXT}"))
    }

    /// Path of the metadata artifact for `key`
    #[must_use]
    pub fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{META_EXT}"))
    }

    /// Write content, then metadata, each with atomic replace
    ///
    /// # Errors
    ///
    /// Returns error if serialization or any file operation fails
    pub async fn write(
        &self,
        key: &CacheKey,
        content: &[u8],
        metadata: &EntryMetadata,
    ) -> Result<()> {
        let meta = serde_json::to_vec_pretty(metadata)
            .map_err(|e| Error::serialization(format!("Failed to serialize entry metadata: {e}")))?;

        write_atomic(&self.content_path(key), content).await?;
        write_atomic(&self.meta_path(key), &meta).await?;

        debug!(%key, bytes = content.len(), "Wrote cache entry");
        Ok(())
    }

    /// Read both artifacts
    ///
    /// Missing artifacts, or a metadata size that disagrees with the content,
    /// yield [`Lookup::Absent`].
    ///
    /// # Errors
    ///
    /// Returns error for I/O failures other than a missing file, and for
    /// unparsable metadata
    pub async fn read(&self, key: &CacheKey) -> Result<Lookup<StoredEntry>> {
        let content_path = self.content_path(key);
        let Some(content) = read_optional(&content_path).await? else {
            return Ok(Lookup::Absent);
        };

        let meta_path = self.meta_path(key);
        let Some(meta) = read_optional(&meta_path).await? else {
            return Ok(Lookup::Absent);
        };
        let metadata: EntryMetadata = serde_json::from_slice(&meta).map_err(|e| {
            Error::serialization(format!(
                "Failed to parse entry metadata {}: {e}",
                meta_path.display()
            ))
        })?;

        if metadata.byte_size != content.len() as u64 {
            warn!(
                %key,
                expected = metadata.byte_size,
                actual = content.len(),
                "Entry content does not match its metadata"
            );
            return Ok(Lookup::Absent);
        }

        Ok(Lookup::Found(StoredEntry { metadata, content }))
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(e, path, "read")),
    }
}
