//! Cache directory layout and root resolution

use crate::{Error, Result};
use dirs::{cache_dir, home_dir};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the cache root
pub const CACHE_DIR_ENV: &str = "FETCHCACHE_CACHE_DIR";
/// Index document name under the cache root
pub const INDEX_FILE: &str = "index.json";
/// Directory holding per-key entry artifacts
pub const ENTRIES_DIR: &str = "entries";

/// Where the cache lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache root directory
    pub root: PathBuf,
}

impl CacheConfig {
    /// Use `root` as-is
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick the cache root, preferring `explicit` and then the environment
    ///
    /// # Errors
    ///
    /// Returns error if no candidate directory is writable
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let inputs = CacheInputs {
            explicit,
            env_cache_dir: non_empty_env(CACHE_DIR_ENV),
            xdg_cache_home: non_empty_env("XDG_CACHE_HOME"),
            os_cache_dir: cache_dir(),
            home_dir: home_dir(),
            temp_dir: std::env::temp_dir(),
        };
        cache_root_from_inputs(inputs).map(Self::new)
    }

    /// Path of the index document
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Directory holding entry artifacts
    #[must_use]
    pub fn entries_dir(&self) -> PathBuf {
        self.root.join(ENTRIES_DIR)
    }
}

fn non_empty_env(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Inputs for determining cache root directory
#[derive(Debug, Clone)]
struct CacheInputs {
    explicit: Option<PathBuf>,
    env_cache_dir: Option<PathBuf>,
    xdg_cache_home: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

fn cache_root_from_inputs(inputs: CacheInputs) -> Result<PathBuf> {
    // Resolution order (first writable wins):
    // 1) --cache-dir
    // 2) FETCHCACHE_CACHE_DIR
    // 3) XDG_CACHE_HOME/fetchcache
    // 4) OS cache dir/fetchcache
    // 5) ~/.fetchcache/cache
    // 6) TMPDIR/fetchcache/cache
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(dir) = inputs.explicit.filter(|p| !p.as_os_str().is_empty()) {
        candidates.push(dir);
    }
    if let Some(dir) = inputs.env_cache_dir {
        candidates.push(dir);
    }
    if let Some(xdg) = inputs.xdg_cache_home {
        candidates.push(xdg.join("fetchcache"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        candidates.push(os_cache.join("fetchcache"));
    }
    if let Some(home) = inputs.home_dir {
        candidates.push(home.join(".fetchcache/cache"));
    }
    candidates.push(inputs.temp_dir.join("fetchcache/cache"));

    candidates
        .into_iter()
        .find(|path| is_usable(path))
        .ok_or_else(|| Error::configuration("Failed to determine a writable cache directory"))
}

fn is_usable(path: &Path) -> bool {
    if path.exists() {
        // Existing directories may still be read-only (e.g. a mounted $HOME in CI)
        let probe = path.join(".write_probe");
        return match std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&probe)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        };
    }
    std::fs::create_dir_all(path).is_ok()
}
