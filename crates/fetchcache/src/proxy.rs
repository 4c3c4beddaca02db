//! Lookup-then-store flow
//!
//! A cache miss is fetched from the origin and, when the origin answers
//! 2xx, stored before being returned. Concurrent misses for the same URL
//! each fetch independently; the last store wins.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use fetchcache_cache::{Cache, ListedEntry, Lookup, ResponseDescriptor};
use fetchcache_fetch::{FetchError, FetchedResponse, Fetcher};
use miette::Diagnostic;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Failure of the lookup-then-store flow
#[derive(Error, Debug, Diagnostic)]
pub enum ProxyError {
    /// The cache could not be read or written
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] fetchcache_cache::Error),

    /// The origin could not be fetched
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from disk
    Cache,
    /// Fetched from the origin during this call
    Origin,
}

/// Response handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    /// Where the body came from
    pub source: ResponseSource,
    /// Whether the body is now in the cache
    pub cached: bool,
    /// Origin status code
    pub status_code: u16,
    /// Origin `Content-Type`
    pub content_type: String,
    /// Origin headers
    pub headers: BTreeMap<String, String>,
    /// Body bytes
    pub body: Vec<u8>,
}

impl ProxyResponse {
    fn from_origin(response: FetchedResponse, cached: bool) -> Self {
        Self {
            source: ResponseSource::Origin,
            cached,
            status_code: response.status_code,
            content_type: response.content_type,
            headers: response.headers,
            body: response.body,
        }
    }
}

/// Cache in front of a [`Fetcher`]
#[derive(Debug, Clone)]
pub struct Proxy<F> {
    cache: Cache,
    fetcher: F,
}

impl<F: Fetcher> Proxy<F> {
    /// Serve lookups from `cache`, filling misses with `fetcher`
    pub const fn new(cache: Cache, fetcher: F) -> Self {
        Self { cache, fetcher }
    }

    /// Return `url` from the cache, fetching and storing it on a miss
    ///
    /// Only 2xx origin responses are stored; others are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Cache`] for cache I/O failures and
    /// [`ProxyError::Fetch`] when the origin cannot be retrieved
    #[instrument(skip(self))]
    pub async fn get_url(&self, url: &str) -> Result<ProxyResponse, ProxyError> {
        if let Lookup::Found(hit) = self.cache.get(url).await? {
            debug!("Serving from cache");
            return Ok(ProxyResponse {
                source: ResponseSource::Cache,
                cached: true,
                status_code: hit.metadata.status_code,
                content_type: hit.metadata.content_type,
                headers: hit.metadata.headers,
                body: hit.content,
            });
        }

        let response = self.fetcher.fetch(url).await?;
        if !response.is_success() {
            info!(status = response.status_code, "Origin response not cacheable");
            return Ok(ProxyResponse::from_origin(response, false));
        }

        let descriptor = ResponseDescriptor {
            status_code: response.status_code,
            content_type: response.content_type.clone(),
            headers: response.headers.clone(),
        };
        self.cache.set(url, &descriptor, &response.body).await?;
        info!(bytes = response.body.len(), "Cached origin response");

        Ok(ProxyResponse::from_origin(response, true))
    }

    /// Everything currently cached
    pub async fn contents(&self) -> Vec<ListedEntry> {
        self.cache.list().await
    }
}
