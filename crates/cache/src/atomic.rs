//! Write-to-temp-then-rename file replacement
//!
//! The temporary sibling is `<path>.tmp` in the same directory, so the rename
//! never crosses a filesystem and is the only observable state transition.

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Suffix appended to the final path while a write is in flight
pub const TMP_SUFFIX: &str = ".tmp";

/// Sibling temp path for `path` (`index.json` -> `index.json.tmp`)
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// Atomically replace `path` with `data`
///
/// A reader sees either the previous file or the complete new one.
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Err(e) = write_synced(&tmp, data).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(Error::io(e, path, "rename"));
    }

    debug!(path = %path.display(), bytes = data.len(), "Replaced file");
    Ok(())
}

async fn write_synced(tmp: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| Error::io(e, tmp, "create"))?;
    file.write_all(data)
        .await
        .map_err(|e| Error::io(e, tmp, "write"))?;
    file.sync_all()
        .await
        .map_err(|e| Error::io(e, tmp, "sync"))?;
    Ok(())
}

/// Remove temp files left behind by an interrupted write
///
/// Only files whose name ends in [`TMP_SUFFIX`] and whose final name (the
/// part before the suffix) satisfies `owned` are removed. Returns the number
/// of files removed. A directory that does not exist yet has nothing to sweep.
pub(crate) async fn sweep_orphaned_tmp(
    dir: &Path,
    owned: impl Fn(&str) -> bool,
) -> Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::io(e, dir, "read_dir")),
    };

    let mut cleaned = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(e, dir, "read_dir_entry"))?
    {
        let path = entry.path();
        let is_orphan = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(TMP_SUFFIX))
            .is_some_and(&owned);
        if !is_orphan {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => cleaned += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to clean orphaned tmp file");
            }
        }
    }

    if cleaned > 0 {
        info!(dir = %dir.display(), cleaned, "Cleaned orphaned tmp files");
    }
    Ok(cleaned)
}
