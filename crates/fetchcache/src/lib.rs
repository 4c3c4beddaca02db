//! fetchcache: a caching fetch proxy
//!
//! Looks a URL up in the persistent cache from [`fetchcache_cache`], and on a
//! miss retrieves it with a [`fetchcache_fetch::Fetcher`] and stores 2xx
//! responses before returning them.
//!
//! ```rust,no_run
//! use fetchcache::proxy::Proxy;
//! use fetchcache_cache::{Cache, CacheConfig};
//! use fetchcache_fetch::{FetchConfig, HttpFetcher};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Cache::initialize(&CacheConfig::new("/var/cache/fetchcache")).await?;
//! let proxy = Proxy::new(cache, HttpFetcher::new(&FetchConfig::default())?);
//!
//! let response = proxy.get_url("https://example.com/").await?;
//! println!("{} bytes from {:?}", response.body.len(), response.source);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod logging;
pub mod proxy;

pub use proxy::{Proxy, ProxyError, ProxyResponse, ResponseSource};
