//! Cache key derivation
//!
//! A key is the SHA-256 digest of the URL string, hex encoded. Keys are
//! filesystem safe and fixed length, so they double as entry file names.

use crate::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Length of a hex encoded cache key
pub const KEY_LEN: usize = 64;

/// A cache key (SHA-256 of the URL as lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Parse a key read back from disk
    ///
    /// # Errors
    ///
    /// Returns error if the string is not 64 lowercase hex characters
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let s = hex.into();
        if s.len() != KEY_LEN {
            return Err(Error::invalid_key(format!(
                "expected {KEY_LEN} hex characters, got {}",
                s.len()
            )));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(Error::invalid_key(format!(
                "`{s}` contains non-hex characters"
            )));
        }
        Ok(Self(s))
    }

    /// Get the hex representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a URL
#[must_use]
pub fn derive_key(url: &str) -> CacheKey {
    CacheKey(hex::encode(Sha256::digest(url.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_known_digest() {
        // SHA-256 of "hello world"
        assert_eq!(
            derive_key("hello world").as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn derive_key_is_fixed_length_hex() {
        for url in ["", "https://a.example", "http://x/?q=../../etc/passwd"] {
            let key = derive_key(url);
            assert_eq!(key.as_str().len(), KEY_LEN);
            assert!(CacheKey::from_hex(key.as_str()).is_ok());
        }
    }

    #[test]
    fn distinct_urls_give_distinct_keys() {
        let a = derive_key("https://a.example");
        let b = derive_key("https://a.example/");
        let c = derive_key("https://A.example");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(CacheKey::from_hex("abc").is_err());
        assert!(CacheKey::from_hex("../".repeat(21) + "a").is_err());
        assert!(CacheKey::from_hex("A".repeat(KEY_LEN)).is_err());
        assert!(CacheKey::from_hex("0".repeat(KEY_LEN)).is_ok());
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = derive_key("https://a.example");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{key}\""));
    }
}
