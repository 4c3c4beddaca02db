//! Persistent response cache for fetchcache
//!
//! This crate owns everything the proxy keeps on disk:
//! - Deterministic cache keys derived from URLs
//! - Per-key entry artifacts (body + metadata), written with atomic replace
//! - An in-memory index persisted as a single JSON document
//! - The [`Cache`] facade tying them together, with self-healing lookups
//!
//! # Layout
//!
//! ```text
//! <root>/index.json              key -> {url, byteSize, cachedAt}
//! <root>/entries/<key>.content   raw body bytes
//! <root>/entries/<key>.meta.json {url, hash, contentType, statusCode, byteSize, cachedAt, headers}
//! ```
//!
//! # Consistency
//!
//! Artifacts are written before the index references them. A crash between
//! the two leaves an unreachable entry; an index record whose artifacts have
//! vanished is dropped the next time it is looked up.

mod atomic;
pub mod entry;
mod error;
pub mod index;
pub mod key;
mod lookup;
pub mod paths;
pub mod store;

// Re-export error types at crate root
pub use error::{Error, Result};

pub use atomic::TMP_SUFFIX;
pub use entry::{EntryMetadata, EntryStore, StoredEntry};
pub use index::{Index, IndexRecord};
pub use key::{CacheKey, derive_key};
pub use lookup::Lookup;
pub use paths::CacheConfig;
pub use store::{Cache, CachedResponse, ListedEntry, ResponseDescriptor};
