//! Error types for the cache crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for cache operations
///
/// A missing entry is not an error: lookups report it as
/// [`Lookup::Absent`](crate::Lookup::Absent).
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(fetchcache::cache::io),
        help("Check file permissions and free space in the cache directory")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "rename")
        operation: String,
    },

    /// The index document exists but cannot be used
    #[error("Cache index {} is corrupt: {message}", path.display())]
    #[diagnostic(
        code(fetchcache::cache::corrupt_index),
        help("Repair or remove the index file; entries not listed in the index are unreachable")
    )]
    CorruptIndex {
        /// Path of the index document
        path: Box<Path>,
        /// What was wrong with it
        message: String,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(fetchcache::cache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A string that is not a valid cache key
    #[error("Invalid cache key: {message}")]
    #[diagnostic(code(fetchcache::cache::invalid_key))]
    InvalidKey {
        /// Why the key was rejected
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(fetchcache::cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a corrupt index error
    #[must_use]
    pub fn corrupt_index(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.as_ref().into(),
            message: msg.into(),
        }
    }

    /// Create an invalid key error
    #[must_use]
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
