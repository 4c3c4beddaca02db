//! Property-based tests for cache key derivation.
//!
//! - Determinism: the same URL always yields the same key
//! - Shape: keys are 64 lowercase hex characters and parse back
//! - Sensitivity: different URLs yield different keys

use fetchcache_cache::{CacheKey, derive_key};
use fetchcache_cache::key::KEY_LEN;
use proptest::prelude::*;

/// Generate URL-ish strings, including hostile path segments
fn url_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "https?://[a-z]{1,12}\\.example(/[a-zA-Z0-9._~-]{0,10}){0,4}(\\?[a-z]=[0-9]{1,4})?"
            .prop_map(String::from),
        "http://[a-z]{1,8}/(\\.\\./){1,5}[a-z]{1,8}".prop_map(String::from),
        any::<String>(),
    ]
}

proptest! {
    #[test]
    fn key_is_deterministic(url in url_strategy()) {
        prop_assert_eq!(derive_key(&url), derive_key(&url));
    }

    #[test]
    fn key_is_filesystem_safe(url in url_strategy()) {
        let key = derive_key(&url);
        prop_assert_eq!(key.as_str().len(), KEY_LEN);
        prop_assert!(key.as_str().bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        prop_assert_eq!(CacheKey::from_hex(key.as_str()).unwrap(), key);
    }

    #[test]
    fn distinct_urls_have_distinct_keys(a in url_strategy(), b in url_strategy()) {
        prop_assume!(a != b);
        prop_assert_ne!(derive_key(&a), derive_key(&b));
    }
}
